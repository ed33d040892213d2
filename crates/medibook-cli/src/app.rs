//! Command handlers.

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use medibook_client::{ApiClient, AuthService, Registration, Verification};
use medibook_core::booking::{BookingForm, BookingRequest};
use medibook_core::cache::{DirectoryCache, DirectorySnapshot};
use medibook_core::config::MedibookConfig;
use medibook_core::error::MedibookError;
use medibook_core::favorites::{displayable, FavoritesStore};
use medibook_core::geo::Coordinate;
use medibook_core::location::{acquire_location, StaticLocation};
use medibook_core::nearby::NearbyFetcher;
use medibook_core::search::SearchEngine;
use medibook_core::session::AuthSession;
use medibook_core::storage::FileStore;
use tracing::{debug, warn};

use crate::render;

/// Everything a command needs, built once per invocation.
pub struct App {
    config: MedibookConfig,
    auth: AuthService<FileStore>,
    session: Option<AuthSession>,
    favorites: FavoritesStore<FileStore>,
    location: StaticLocation,
}

impl App {
    pub async fn open(config: MedibookConfig, location: Option<Coordinate>) -> Result<Self> {
        let store = FileStore::new(config.data_dir());
        let api = ApiClient::new(&config.api)?;
        let auth = AuthService::new(api, store.clone());
        let session = auth.restore().await;
        debug!(signed_in = session.is_some(), data_dir = %store.data_dir().display(), "Client ready");

        Ok(Self {
            config,
            auth,
            session,
            favorites: FavoritesStore::new(store),
            location: location.map_or_else(StaticLocation::denied, StaticLocation::at),
        })
    }

    fn api(&self) -> &ApiClient {
        self.auth.api()
    }

    fn session(&self) -> Result<&AuthSession> {
        self.session
            .as_ref()
            .context("Not signed in. Run `medibook login <mobile>` first.")
    }

    async fn load_directory(&self) -> Result<Arc<DirectorySnapshot>> {
        let cache = DirectoryCache::new(self.api().clone());
        Ok(self.auth.check(cache.ensure_loaded().await).await?)
    }

    // ==================== Search ====================

    pub async fn search(&self, query: &str) -> Result<()> {
        let engine = SearchEngine::new(self.config.search.clone());
        if !engine.accepts(query) {
            bail!(
                "Type at least {} characters to search",
                self.config.search.min_query_len
            );
        }

        let snapshot = self.load_directory().await?;
        let origin = acquire_location(&self.location).await.ok();
        let results = engine.search(query, &snapshot, origin);

        if results.is_empty() {
            println!("No doctors found matching '{}'", query.trim());
        }
        for result in &results {
            println!("{}", render::doctor(result));
        }
        Ok(())
    }

    pub async fn nearby(&self) -> Result<()> {
        let origin = match acquire_location(&self.location).await {
            Ok(origin) => origin,
            Err(MedibookError::PermissionDenied) => {
                bail!("No location available. Pass --lat and --lon, or use `medibook search`.")
            }
            Err(e) => return Err(e.into()),
        };

        let fetcher = NearbyFetcher::new(self.api().clone(), self.config.nearby.clone());
        let results = self.auth.check(fetcher.fetch(origin).await).await?;

        if results.is_empty() {
            println!(
                "No doctors within {} km. Try searching by name.",
                fetcher.config().radius_km
            );
        }
        for result in &results {
            println!("{}", render::doctor(result));
        }
        Ok(())
    }

    // ==================== Favorites ====================

    pub async fn favorites_list(&self) -> Result<()> {
        let user = self.session()?.user_scope();
        let entries = displayable(self.favorites.list(user).await);
        if entries.is_empty() {
            println!("No favorites yet.");
        }
        for entry in &entries {
            println!("{}", render::favorite(entry));
        }
        Ok(())
    }

    pub async fn favorites_add(&self, doctor_id: &str, dispensary_id: &str) -> Result<()> {
        let user = self.session()?.user_scope();
        let snapshot = self.load_directory().await?;
        let doctor = snapshot
            .doctor(doctor_id)
            .with_context(|| format!("No doctor with id {doctor_id}"))?;
        let dispensary = snapshot
            .dispensary(dispensary_id)
            .with_context(|| format!("No dispensary with id {dispensary_id}"))?;

        match self
            .favorites
            .add(user, doctor.into(), dispensary.into())
            .await
        {
            Ok(entry) => println!("Added {}", render::favorite(&entry)),
            Err(MedibookError::AlreadyExists(id)) => println!("{id} is already a favorite"),
            Err(e) => return Err(e.into()),
        }
        Ok(())
    }

    pub async fn favorites_remove(&self, favorite_id: &str) -> Result<()> {
        let user = self.session()?.user_scope();
        self.favorites.remove(user, favorite_id).await?;
        println!("Removed {favorite_id}");
        Ok(())
    }

    // ==================== Account ====================

    pub async fn login(&self, mobile: &str) -> Result<()> {
        let response = self.auth.request_otp(mobile).await?;
        println!(
            "{}",
            response
                .message
                .unwrap_or_else(|| "Code sent. Run `medibook verify <mobile> <code>`.".into())
        );
        Ok(())
    }

    pub async fn resend(&self, mobile: &str) -> Result<()> {
        let response = self.auth.resend_otp(mobile).await?;
        println!("{}", response.message.unwrap_or_else(|| "Code resent.".into()));
        Ok(())
    }

    pub async fn verify(&self, mobile: &str, otp: &str) -> Result<()> {
        match self.auth.verify(mobile, otp).await? {
            Verification::SignedIn(session) => {
                println!("Signed in as {}", render::user(&session.user));
            }
            Verification::NotRegistered => {
                println!("No account for this number. Run `medibook register <mobile> <name>`.");
            }
            Verification::Rejected { message } => {
                bail!(message.unwrap_or_else(|| "Invalid code".into()));
            }
        }
        Ok(())
    }

    pub async fn register(&self, registration: &Registration) -> Result<()> {
        self.auth.register(registration).await?;
        println!("Account created. Run `medibook login {}` to sign in.", registration.mobile);
        Ok(())
    }

    pub async fn logout(&self) -> Result<()> {
        self.auth.logout().await?;
        println!("Signed out");
        Ok(())
    }

    pub fn whoami(&self) {
        match &self.session {
            Some(session) => println!("{}", render::user(&session.user)),
            None => println!("Not signed in"),
        }
    }

    // ==================== Booking ====================

    pub async fn slots(&self, doctor_id: &str, dispensary_id: &str) -> Result<()> {
        let days = self
            .auth
            .check(self.api().next_available_slots(doctor_id, dispensary_id).await)
            .await?;
        if days.available_days.is_empty() {
            println!("No upcoming sessions");
        }
        for (index, slot) in days.available_days.iter().enumerate() {
            println!("{}", render::slot(index, slot));
        }
        Ok(())
    }

    pub async fn fees(&self, doctor_id: &str, dispensary_id: &str) -> Result<()> {
        let fees = self
            .auth
            .check(self.api().fees(doctor_id, dispensary_id).await)
            .await?;
        println!("{}", render::fees(&fees));
        Ok(())
    }

    pub async fn book(&self, booking: &Booking) -> Result<()> {
        let user = &self.session()?.user;
        let form = BookingForm {
            patient_name: booking.name.clone().unwrap_or_else(|| user.name.clone()),
            patient_phone: booking.phone.clone().unwrap_or_else(|| user.mobile.clone()),
        };
        form.validate()?;

        let days = self
            .auth
            .check(
                self.api()
                    .next_available_slots(&booking.doctor_id, &booking.dispensary_id)
                    .await,
            )
            .await?;
        let slot = days.available_days.get(booking.slot).with_context(|| {
            format!(
                "No session at index {}. Run `medibook slots` to list them.",
                booking.slot
            )
        })?;

        let fees = match self
            .api()
            .fees(&booking.doctor_id, &booking.dispensary_id)
            .await
        {
            Ok(fees) => Some(fees),
            Err(e) => {
                warn!(error = %e, "Fees unavailable, booking without breakdown");
                None
            }
        };

        let request = BookingRequest::new(
            &form,
            &booking.doctor_id,
            &booking.dispensary_id,
            slot,
            fees,
        )?;
        let confirmation = self
            .auth
            .check(self.api().create_booking(&request).await)
            .await?;

        println!(
            "Booked appointment #{} on {}",
            request.appointment_number, request.booking_date
        );
        println!("Transaction: {}", confirmation.transaction_id);
        Ok(())
    }

    pub async fn summary(&self, transaction_id: &str) -> Result<()> {
        let summary = self
            .auth
            .check(self.api().booking_summary(transaction_id).await)
            .await?;
        println!("{}", serde_json::to_string_pretty(&summary)?);
        Ok(())
    }

    // ==================== Configuration ====================

    pub fn show_config(&self) -> Result<()> {
        println!("{}", serde_json::to_string_pretty(&self.config)?);
        Ok(())
    }
}

/// Arguments of the `book` command.
pub struct Booking {
    pub doctor_id: String,
    pub dispensary_id: String,
    pub slot: usize,
    pub name: Option<String>,
    pub phone: Option<String>,
}

/// Write the default configuration to `path`.
pub fn init_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    MedibookConfig::default().save(path)?;
    println!("Wrote {}", path.display());
    Ok(())
}
