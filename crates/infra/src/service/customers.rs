use chrono::{DateTime, Utc};
use tracing::{info, instrument};

use billbook_core::{CustomerId, DomainError};
use billbook_parties::{Customer, CustomerDetails};

use crate::store::{CustomerDirectory, StoreError};

use super::{ServiceError, ServiceResult};

/// Customer registration and maintenance.
#[derive(Debug)]
pub struct CustomerService<P> {
    customers: P,
}

fn customer_error(err: StoreError) -> ServiceError {
    match err {
        StoreError::NotFound(_) => DomainError::CustomerNotFound.into(),
        other => other.into(),
    }
}

fn email_error(err: StoreError, message: &str) -> ServiceError {
    match err {
        StoreError::UniqueConstraintViolation(_) => DomainError::invalid(message).into(),
        other => customer_error(other),
    }
}

impl<P: CustomerDirectory> CustomerService<P> {
    pub fn new(customers: P) -> Self {
        Self { customers }
    }

    pub fn get(&self, id: CustomerId) -> ServiceResult<Customer> {
        self.customers
            .find_active_customer(id)
            .map_err(customer_error)
    }

    pub fn list(&self) -> ServiceResult<Vec<Customer>> {
        Ok(self.customers.list_active()?)
    }

    /// Register a customer. Emails are unique among active customers.
    #[instrument(skip(self, details, now), err)]
    pub fn register(&self, details: CustomerDetails, now: DateTime<Utc>) -> ServiceResult<Customer> {
        let customer = Customer::register(CustomerId::new(), details, now)?;
        self.customers
            .insert(customer.clone())
            .map_err(|e| email_error(e, "customer with this email already exists"))?;
        info!(customer_id = %customer.id_typed(), "customer registered");
        Ok(customer)
    }

    #[instrument(skip(self, details), err)]
    pub fn update(&self, id: CustomerId, details: CustomerDetails) -> ServiceResult<Customer> {
        let customer = self
            .customers
            .update_details(id, details)
            .map_err(|e| email_error(e, "another customer with this email already exists"))?;
        info!(customer_id = %id, "customer updated");
        Ok(customer)
    }

    /// Soft delete. Existing documents keep their reference; new ones are refused.
    #[instrument(skip(self), err)]
    pub fn deactivate(&self, id: CustomerId) -> ServiceResult<Customer> {
        let customer = self
            .customers
            .deactivate(id)
            .map_err(customer_error)?;
        info!(customer_id = %id, "customer deactivated");
        Ok(customer)
    }
}
