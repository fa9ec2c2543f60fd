//! Business logic services

pub mod auth;
pub mod availability;
pub mod export;
pub mod loans;

use crate::{config::AuthConfig, repository::Repository};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub auth: auth::AuthService,
    pub availability: availability::AvailabilityService,
    pub loans: loans::LoanService,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(repository: Repository, auth_config: AuthConfig) -> Self {
        let availability = availability::AvailabilityService::new(repository.clone());
        Self {
            auth: auth::AuthService::new(repository.clone(), auth_config),
            loans: loans::LoanService::new(repository, availability.clone()),
            availability,
        }
    }
}
