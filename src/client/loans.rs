//! Typed loan API bindings.
//!
//! Every call goes through the resource client and the rate-limit retry
//! executor; callers see domain types and `ApiError`, nothing HTTP.

use std::sync::Arc;

use crate::models::loan::{
    BulkResult, BulkStatusUpdate, CancelLoan, CreateLoan, LoanDetails, LoanStats, ReturnLoan,
};

use super::http::{ApiClient, ApiError, Pagination};
use super::retry::{execute_with_retry, RetryPolicy};

/// Filters for the loan list and export endpoints
#[derive(Debug, Default, Clone)]
pub struct LoanListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub status: Option<String>,
    pub search: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

impl LoanListQuery {
    fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(page) = self.page {
            pairs.push(("page", page.to_string()));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit", limit.to_string()));
        }
        if let Some(ref status) = self.status {
            pairs.push(("status", status.clone()));
        }
        if let Some(ref search) = self.search {
            pairs.push(("search", search.clone()));
        }
        if let Some(ref sort_by) = self.sort_by {
            pairs.push(("sort_by", sort_by.clone()));
        }
        if let Some(ref sort_order) = self.sort_order {
            pairs.push(("sort_order", sort_order.clone()));
        }
        pairs
    }
}

pub struct LoanApi {
    client: Arc<ApiClient>,
    retry: RetryPolicy,
}

impl LoanApi {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self {
            client,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(client: Arc<ApiClient>, retry: RetryPolicy) -> Self {
        Self { client, retry }
    }

    pub async fn list(
        &self,
        query: &LoanListQuery,
    ) -> Result<(Vec<LoanDetails>, Option<Pagination>), ApiError> {
        let pairs = query.to_pairs();
        execute_with_retry(self.retry, || {
            self.client.get_paginated("/loans", &pairs)
        })
        .await
    }

    pub async fn get(&self, loan_id: i32) -> Result<LoanDetails, ApiError> {
        let path = format!("/loans/{}", loan_id);
        execute_with_retry(self.retry, || self.client.get(&path, &[])).await
    }

    pub async fn create(&self, request: &CreateLoan) -> Result<LoanDetails, ApiError> {
        execute_with_retry(self.retry, || self.client.post("/loans", request)).await
    }

    pub async fn return_loan(
        &self,
        loan_id: i32,
        request: &ReturnLoan,
    ) -> Result<LoanDetails, ApiError> {
        let path = format!("/loans/{}/return", loan_id);
        execute_with_retry(self.retry, || self.client.put(&path, request)).await
    }

    pub async fn cancel(
        &self,
        loan_id: i32,
        request: &CancelLoan,
    ) -> Result<LoanDetails, ApiError> {
        let path = format!("/loans/{}/cancel", loan_id);
        execute_with_retry(self.retry, || self.client.put(&path, request)).await
    }

    pub async fn bulk_update_status(
        &self,
        request: &BulkStatusUpdate,
    ) -> Result<BulkResult, ApiError> {
        execute_with_retry(self.retry, || {
            self.client.patch("/loans/bulk-update-status", request)
        })
        .await
    }

    pub async fn delete(&self, loan_id: i32) -> Result<(), ApiError> {
        let path = format!("/loans/{}", loan_id);
        execute_with_retry(self.retry, || self.client.delete(&path)).await
    }

    pub async fn stats(&self) -> Result<LoanStats, ApiError> {
        execute_with_retry(self.retry, || self.client.get("/loans/stats", &[])).await
    }

    pub async fn export_csv(&self, query: &LoanListQuery) -> Result<Vec<u8>, ApiError> {
        let pairs = query.to_pairs();
        execute_with_retry(self.retry, || {
            self.client.get_bytes("/loans/export/csv", &pairs)
        })
        .await
    }

    pub async fn export_pdf(&self, query: &LoanListQuery) -> Result<Vec<u8>, ApiError> {
        let pairs = query.to_pairs();
        execute_with_retry(self.retry, || {
            self.client.get_bytes("/loans/export/pdf", &pairs)
        })
        .await
    }
}
