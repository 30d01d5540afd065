//! Infrahub client implementation

use crate::error::InventoryError;
use crate::graphql::{
    GraphQlRequest, GraphQlResponse, branch_create_mutation, branch_created, options_query,
    parse_options,
};
use franc_portal_core::inventory::{
    BranchFuture, BranchManager, InventoryKind, OptionFilter, OptionSource, OptionsFuture,
    SelectOption,
};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Duration;

/// Branch used for lookups unless configured otherwise.
pub const DEFAULT_BRANCH: &str = "main";

/// Header carrying the API token.
pub const API_TOKEN_HEADER: &str = "X-INFRAHUB-KEY";

/// Infrahub GraphQL client
#[derive(Clone)]
pub struct InfrahubClient {
    client: Client,
    address: String,
    branch: String,
    api_token: Option<String>,
}

impl std::fmt::Debug for InfrahubClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InfrahubClient")
            .field("address", &self.address)
            .field("branch", &self.branch)
            .field("api_token", &self.api_token.as_ref().map(|_| "<redacted>"))
            .finish_non_exhaustive()
    }
}

impl InfrahubClient {
    /// Create a client for the Infrahub instance at `address`
    #[must_use]
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            address: address.into().trim_end_matches('/').to_string(),
            branch: DEFAULT_BRANCH.to_string(),
            api_token: None,
        }
    }

    /// Read options from `branch` instead of `main`
    #[must_use]
    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = branch.into();
        self
    }

    /// Send `token` with every request
    #[must_use]
    pub fn with_api_token(mut self, token: impl Into<String>) -> Self {
        self.api_token = Some(token.into());
        self
    }

    /// Bound every HTTP request by `timeout`
    ///
    /// # Errors
    ///
    /// Returns `InventoryError::Configuration` if the HTTP client cannot be built
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self, InventoryError> {
        self.client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| InventoryError::Configuration(e.to_string()))?;
        Ok(self)
    }

    /// Branch used for option lookups
    #[must_use]
    pub fn branch(&self) -> &str {
        &self.branch
    }

    /// Run a GraphQL document against `branch` and return its `data`
    ///
    /// # Errors
    ///
    /// Returns errors for network failures, non-success statuses, GraphQL
    /// errors or unparseable responses
    pub async fn execute(&self, branch: &str, query: String) -> Result<Value, InventoryError> {
        let mut request = self
            .client
            .post(format!("{}/graphql/{branch}", self.address))
            .json(&GraphQlRequest { query });
        if let Some(token) = &self.api_token {
            request = request.header(API_TOKEN_HEADER, token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| InventoryError::RequestFailed(e.to_string()))?;

        match response.status() {
            StatusCode::OK => response
                .json::<GraphQlResponse>()
                .await
                .map_err(|e| InventoryError::ResponseParseFailed(e.to_string()))?
                .into_data(),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(InventoryError::Unauthorized),
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(InventoryError::ApiError {
                    status: status.as_u16(),
                    message: body,
                })
            },
        }
    }

    /// Every node of `kind` matching `filters` as selectable options
    ///
    /// # Errors
    ///
    /// See [`InfrahubClient::execute`]; also fails if the result is not a
    /// node connection
    #[tracing::instrument(skip(self, filters), fields(branch = %self.branch))]
    pub async fn select_options(
        &self,
        kind: InventoryKind,
        filters: &[OptionFilter],
    ) -> Result<Vec<SelectOption>, InventoryError> {
        let data = self.execute(&self.branch, options_query(kind, filters)).await?;
        let options = parse_options(kind, &data)?;
        tracing::debug!(count = options.len(), "inventory options fetched");
        Ok(options)
    }

    /// Create branch `name` without git sync
    ///
    /// # Errors
    ///
    /// See [`InfrahubClient::execute`]; also fails if Infrahub does not
    /// report the branch as created
    #[tracing::instrument(skip(self))]
    pub async fn create_branch(&self, name: &str) -> Result<(), InventoryError> {
        let data = self.execute(DEFAULT_BRANCH, branch_create_mutation(name)).await?;
        if !branch_created(&data) {
            return Err(InventoryError::GraphQl(format!("branch {name} was not created")));
        }
        tracing::info!("inventory branch created");
        Ok(())
    }
}

impl OptionSource for InfrahubClient {
    fn fetch_options<'a>(
        &'a self,
        kind: InventoryKind,
        filters: &'a [OptionFilter],
    ) -> OptionsFuture<'a> {
        Box::pin(async move { Ok(self.select_options(kind, filters).await?) })
    }
}

impl BranchManager for InfrahubClient {
    fn create_branch<'a>(&'a self, name: &'a str) -> BranchFuture<'a> {
        Box::pin(async move { Ok(Self::create_branch(self, name).await?) })
    }
}
