//! License lifecycle: startup load, activation, queries and periodic checks.
//!
//! The manager owns a single "current license" slot. Writers replace the
//! whole `Arc<LicenseRecord>`; readers clone the `Arc` out under a read lock
//! and work on that snapshot, so no reader ever sees a half-updated record.
//!
//! ```text
//! [startup] --load from storage-->
//!    no file / load or parse failure  -> NoLicense
//!    loaded & expired                 -> Expired
//!    loaded & valid                   -> Valid
//! NoLicense | Expired  + FailClosed   -> error
//! NoLicense | Expired  + FailOpen     -> continue (expired license retained)
//! ```

use crate::clock::{Clock, SystemClock};
use crate::config::{LicenseConfig, StartupPolicy};
use crate::error::{LicenseError, LicenseResult};
use crate::event::{dispatch, LicenseEventListener, NoopListener};
use crate::record::LicenseRecord;
use crate::store::ActivationStore;
use crate::validator::{LicenseValidator, Validate};
use chrono::{DateTime, FixedOffset, Utc};
use serde::Serialize;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{error, info, warn};

/// Max characters of customer/product names in the startup log line.
const LOG_NAME_WIDTH: usize = 20;

/// Result of [`LicenseManager::initialize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartupOutcome {
    /// Licensing is disabled by configuration.
    Disabled,
    /// Startup validation is not configured.
    Skipped,
    /// Nothing usable was stored; continuing unactivated.
    NoLicense,
    /// The stored license is expired; it is retained as current.
    Expired,
    /// The stored license is valid and adopted.
    Valid,
}

/// Applies the startup policy to what was found in storage.
///
/// `loaded` is one of [`StartupOutcome::NoLicense`], [`StartupOutcome::Expired`]
/// or [`StartupOutcome::Valid`].
///
/// # Errors
///
/// Under [`StartupPolicy::FailClosed`], `NoLicense` becomes
/// [`LicenseError::NotActivated`] and `Expired` becomes [`LicenseError::Expired`].
pub fn resolve_startup(
    loaded: StartupOutcome,
    expire_at: Option<DateTime<FixedOffset>>,
    policy: StartupPolicy,
) -> LicenseResult<StartupOutcome> {
    match (loaded, policy) {
        (StartupOutcome::NoLicense, StartupPolicy::FailClosed) => Err(LicenseError::NotActivated),
        (StartupOutcome::Expired, StartupPolicy::FailClosed) => Err(LicenseError::Expired {
            expire_at: expire_at.map(|t| t.to_rfc3339()).unwrap_or_default(),
        }),
        (outcome, _) => Ok(outcome),
    }
}

/// Coarse license state for status reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LicenseState {
    NotActivated,
    Valid,
    Expired,
}

/// Point-in-time summary of the current license.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LicenseStatus {
    pub state: LicenseState,
    pub expire_at: Option<DateTime<FixedOffset>>,
    pub days_left: i64,
}

impl LicenseStatus {
    /// Whether any license is adopted, expired or not.
    #[must_use]
    pub fn is_activated(&self) -> bool {
        self.state != LicenseState::NotActivated
    }

    /// Whether the adopted license is usable.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.state == LicenseState::Valid
    }
}

/// Holds the current license and drives its lifecycle.
#[derive(Debug)]
pub struct LicenseManager {
    config: LicenseConfig,
    validator: Arc<dyn Validate>,
    store: ActivationStore,
    listener: Arc<dyn LicenseEventListener>,
    clock: Arc<dyn Clock>,
    current: RwLock<Option<Arc<LicenseRecord>>>,
}

impl LicenseManager {
    /// Creates a manager with no current license.
    #[must_use]
    pub fn new(config: LicenseConfig, validator: Arc<dyn Validate>) -> Self {
        let store = ActivationStore::new(config.storage_path.clone());
        Self {
            config,
            validator,
            store,
            listener: Arc::new(NoopListener),
            clock: Arc::new(SystemClock),
            current: RwLock::new(None),
        }
    }

    /// Creates a manager whose validator trusts `config.public_key`.
    ///
    /// # Errors
    ///
    /// Returns [`LicenseError::Config`] if no public key is configured, or a
    /// validation error if it cannot be loaded.
    pub fn from_config(config: LicenseConfig) -> LicenseResult<Self> {
        let pem = config
            .public_key
            .as_deref()
            .ok_or_else(|| LicenseError::Config("public_key is not configured".to_string()))?;
        let validator = LicenseValidator::from_pem(pem)?;
        Ok(Self::new(config, Arc::new(validator)))
    }

    /// Sets the notification sink.
    #[must_use]
    pub fn with_listener(mut self, listener: Arc<dyn LicenseEventListener>) -> Self {
        self.listener = listener;
        self
    }

    /// Sets the clock used for expiry decisions. Records returned by
    /// [`LicenseManager::activate`] or loaded at startup have their derived
    /// fields recomputed against it, whatever clock the validator uses.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// The configuration this manager was built with.
    #[must_use]
    pub fn config(&self) -> &LicenseConfig {
        &self.config
    }

    /// Runs startup validation if licensing is enabled and configured to.
    ///
    /// # Errors
    ///
    /// Only under [`StartupPolicy::FailClosed`]: [`LicenseError::NotActivated`]
    /// when nothing usable is stored, [`LicenseError::Expired`] when the stored
    /// license is expired (after the "expired" notification fires).
    pub fn initialize(&self) -> LicenseResult<StartupOutcome> {
        if !self.config.enabled {
            info!("license validation disabled");
            return Ok(StartupOutcome::Disabled);
        }
        if !self.config.validate_on_startup {
            return Ok(StartupOutcome::Skipped);
        }

        let now = self.clock.now();
        let (loaded, expire_at) = match self.load_from_storage() {
            None => {
                warn!(
                    "system not activated - please activate a license (storage: {})",
                    self.store.path().display()
                );
                (StartupOutcome::NoLicense, None)
            }
            Some(license) if license.is_expired_at(now) => {
                error!("license expired - expiry date: {}", license.expire_at);
                self.replace(Some(Arc::clone(&license)));
                dispatch(self.listener.as_ref(), "expired", |l| l.on_expired(&license));
                (StartupOutcome::Expired, Some(license.expire_at))
            }
            Some(license) => {
                info!(
                    "license validation successful - customer: {}, product: {}, expiry: {}, days left: {}",
                    truncate(&license.customer_name, LOG_NAME_WIDTH),
                    truncate(&license.product_name, LOG_NAME_WIDTH),
                    license.expire_at,
                    license.days_left_at(now)
                );
                self.replace(Some(Arc::clone(&license)));
                self.warn_if_expiring(&license, now);
                (StartupOutcome::Valid, Some(license.expire_at))
            }
        };

        let resolved = resolve_startup(loaded, expire_at, self.config.startup_policy);
        if let Err(e) = &resolved {
            error!(error = %e, "license initialization failed");
        }
        resolved
    }

    /// Validates, persists and adopts `activation_code`.
    ///
    /// On any error the current license and the storage file are left as
    /// they were.
    ///
    /// # Errors
    ///
    /// - [`LicenseError::Validation`] if the code does not validate.
    /// - [`LicenseError::Expired`] if the license is already expired.
    /// - [`LicenseError::Persistence`] if the code cannot be stored.
    pub fn activate(&self, activation_code: &str) -> LicenseResult<Arc<LicenseRecord>> {
        info!("starting license activation");

        let mut license = self.validator.validate(activation_code)?;
        license.refresh_at(self.clock.now());
        if license.is_expired() {
            return Err(LicenseError::Expired {
                expire_at: license.expire_at.to_rfc3339(),
            });
        }

        self.store.save(activation_code)?;

        let license = Arc::new(license);
        self.replace(Some(Arc::clone(&license)));
        dispatch(self.listener.as_ref(), "activated", |l| l.on_activated(&license));

        info!("license activated successfully: {}", license.customer_name);
        Ok(license)
    }

    /// The adopted license, if any. It may be expired.
    #[must_use]
    pub fn current_license(&self) -> Option<Arc<LicenseRecord>> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Fails unless a non-expired license is adopted.
    ///
    /// # Errors
    ///
    /// [`LicenseError::NotActivated`] or [`LicenseError::Expired`].
    pub fn check_license(&self) -> LicenseResult<()> {
        self.usable_license().map(|_| ())
    }

    /// Fails unless a non-expired license granting `module` is adopted.
    ///
    /// # Errors
    ///
    /// Those of [`LicenseManager::check_license`], then
    /// [`LicenseError::ModuleNotAuthorized`].
    pub fn check_module(&self, module: &str) -> LicenseResult<()> {
        let license = self.usable_license()?;
        if !license.has_module(module) {
            return Err(LicenseError::ModuleNotAuthorized(module.to_string()));
        }
        Ok(())
    }

    /// Whether the adopted license lists `module`, regardless of expiry.
    #[must_use]
    pub fn has_module(&self, module: &str) -> bool {
        self.current_license()
            .is_some_and(|license| license.has_module(module))
    }

    /// True iff a license is adopted and not expired.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.usable_license().is_ok()
    }

    /// Summarises the current license.
    #[must_use]
    pub fn status(&self) -> LicenseStatus {
        let now = self.clock.now();
        match self.current_license() {
            None => LicenseStatus {
                state: LicenseState::NotActivated,
                expire_at: None,
                days_left: 0,
            },
            Some(license) => LicenseStatus {
                state: if license.is_expired_at(now) {
                    LicenseState::Expired
                } else {
                    LicenseState::Valid
                },
                expire_at: Some(license.expire_at),
                days_left: license.days_left_at(now),
            },
        }
    }

    /// Periodic check: notifies "expired" or "expiring soon" for the current
    /// license. Notifications repeat on every call; nothing is de-duplicated.
    pub fn check_license_status(&self) {
        let Some(license) = self.current_license() else {
            info!("skipping check: not activated");
            return;
        };

        let now = self.clock.now();
        if license.is_expired_at(now) {
            error!("periodic check: license expired");
            dispatch(self.listener.as_ref(), "expired", |l| l.on_expired(&license));
        } else {
            self.warn_if_expiring(&license, now);
        }
    }

    fn usable_license(&self) -> LicenseResult<Arc<LicenseRecord>> {
        let license = self.current_license().ok_or(LicenseError::NotActivated)?;
        if license.is_expired_at(self.clock.now()) {
            return Err(LicenseError::Expired {
                expire_at: license.expire_at.to_rfc3339(),
            });
        }
        Ok(license)
    }

    fn warn_if_expiring(&self, license: &LicenseRecord, now: DateTime<Utc>) {
        let days_left = license.days_left_at(now);
        if days_left <= self.config.expiry_warning_days {
            warn!("license will expire in {} days, please renew", days_left);
            dispatch(self.listener.as_ref(), "expiring_soon", |l| {
                l.on_expiring_soon(license, days_left);
            });
        }
    }

    /// Reads and validates the stored code. Any failure means "no license".
    fn load_from_storage(&self) -> Option<Arc<LicenseRecord>> {
        let code = match self.store.load() {
            Ok(Some(code)) => code,
            Ok(None) => return None,
            Err(e) => {
                error!(error = %e, "failed to load license file");
                return None;
            }
        };

        match self.validator.validate(&code) {
            Ok(mut license) => {
                license.refresh_at(self.clock.now());
                info!("license loaded successfully from file");
                Some(Arc::new(license))
            }
            Err(e) => {
                error!(error = %e, "failed to load license file");
                None
            }
        }
    }

    fn replace(&self, license: Option<Arc<LicenseRecord>>) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = license;
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let kept: String = s.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{kept}...")
}
