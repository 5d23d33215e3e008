//! Search query surface
//!
//! Validates raw string parameters into a `SearchRequest`, builds the index
//! filter expression and runs keyword or hybrid searches.

use crate::ai::Embedder;
use crate::config::SearchConfig;
use crate::search::client::{HybridQuery, SearchIndex, SearchQuery};
use crate::search::settings::DEFAULT_EMBEDDER;
use crate::ProspectError;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

pub const DEFAULT_LIMIT: usize = 20;

/// Rejected query parameters
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Query parameter 'q' is required")]
    MissingQuery,

    #[error("Invalid type '{0}'. Must be 'nodes' or 'properties'")]
    InvalidType(String),

    #[error("Invalid value '{value}' for '{param}': expected a non-negative integer")]
    InvalidNumber { param: String, value: String },

    #[error("Filter '{filter}' is not available when searching {search_type}")]
    UnsupportedFilter {
        filter: String,
        search_type: SearchType,
    },
}

/// Which index a search targets
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SearchType {
    #[default]
    Nodes,
    Properties,
}

impl SearchType {
    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        match value {
            "nodes" => Ok(SearchType::Nodes),
            "properties" => Ok(SearchType::Properties),
            other => Err(ValidationError::InvalidType(other.to_string())),
        }
    }

    pub fn index_name<'a>(&self, config: &'a SearchConfig) -> &'a str {
        match self {
            SearchType::Nodes => &config.nodes_index,
            SearchType::Properties => &config.properties_index,
        }
    }
}

impl fmt::Display for SearchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchType::Nodes => write!(f, "nodes"),
            SearchType::Properties => write!(f, "properties"),
        }
    }
}

/// Equality filters; blank values are ignored
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchFilters {
    pub industry: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
}

/// A validated search
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub query: String,
    pub search_type: SearchType,
    pub limit: usize,
    pub offset: usize,
    /// Hybrid keyword + vector ranking
    pub vector: bool,
    pub filters: SearchFilters,
}

fn param<'a>(params: &'a HashMap<String, String>, name: &str) -> Option<&'a str> {
    params
        .get(name)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
}

fn number_param(
    params: &HashMap<String, String>,
    name: &str,
    default: usize,
) -> Result<usize, ValidationError> {
    match param(params, name) {
        None => Ok(default),
        Some(value) => value.parse().map_err(|_| ValidationError::InvalidNumber {
            param: name.to_string(),
            value: value.to_string(),
        }),
    }
}

impl SearchRequest {
    /// Validates raw parameters
    ///
    /// `q` is required. `type` defaults to nodes, `limit` to 20 and `offset`
    /// to 0. Vector mode is on only for the literal value `true`.
    ///
    /// # Examples
    ///
    /// ```
    /// use prospect::search::{SearchRequest, SearchType, ValidationError};
    /// use std::collections::HashMap;
    ///
    /// let mut params = HashMap::new();
    /// params.insert("q".to_string(), "bike shop".to_string());
    /// params.insert("vector".to_string(), "1".to_string());
    ///
    /// let request = SearchRequest::from_params(&params).unwrap();
    /// assert_eq!(request.search_type, SearchType::Nodes);
    /// assert_eq!(request.limit, 20);
    /// assert!(!request.vector);
    ///
    /// assert_eq!(
    ///     SearchRequest::from_params(&HashMap::new()),
    ///     Err(ValidationError::MissingQuery)
    /// );
    /// ```
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self, ValidationError> {
        let query = params
            .get("q")
            .filter(|q| !q.is_empty())
            .cloned()
            .ok_or(ValidationError::MissingQuery)?;

        let search_type = match params.get("type") {
            Some(value) => SearchType::parse(value)?,
            None => SearchType::default(),
        };

        let request = Self {
            query,
            search_type,
            limit: number_param(params, "limit", DEFAULT_LIMIT)?,
            offset: number_param(params, "offset", 0)?,
            vector: params.get("vector").map(String::as_str) == Some("true"),
            filters: SearchFilters {
                industry: param(params, "industry").map(str::to_string),
                city: param(params, "city").map(str::to_string),
                state: param(params, "state").map(str::to_string),
                country: param(params, "country").map(str::to_string),
            },
        };
        request.filter_expression()?;
        Ok(request)
    }

    pub fn filter_expression(&self) -> Result<Option<String>, ValidationError> {
        build_filter(self.search_type, &self.filters)
    }
}

/// Quotes a filter value, escaping backslashes and double quotes
fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

/// Builds the AND-joined equality filter for a search type
///
/// Node searches filter on the embedded property projection
/// (`property.city`); property searches use the bare attribute names and have
/// no industry.
pub fn build_filter(
    search_type: SearchType,
    filters: &SearchFilters,
) -> Result<Option<String>, ValidationError> {
    let location_prefix = match search_type {
        SearchType::Nodes => "property.",
        SearchType::Properties => "",
    };

    let mut clauses = Vec::new();

    if let Some(industry) = &filters.industry {
        if search_type == SearchType::Properties {
            return Err(ValidationError::UnsupportedFilter {
                filter: "industry".to_string(),
                search_type,
            });
        }
        clauses.push(format!("industry = {}", quote(industry)));
    }

    for (field, value) in [
        ("city", &filters.city),
        ("state", &filters.state),
        ("country", &filters.country),
    ] {
        if let Some(value) = value {
            clauses.push(format!("{}{} = {}", location_prefix, field, quote(value)));
        }
    }

    if clauses.is_empty() {
        Ok(None)
    } else {
        Ok(Some(clauses.join(" AND ")))
    }
}

/// Search results echoed back to the caller
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub hits: Vec<Value>,
    pub estimated_total_hits: Option<u64>,
    pub limit: usize,
    pub offset: usize,
    pub processing_time_ms: u64,
    pub query: String,
}

/// Runs a validated search
///
/// In vector mode the query is embedded first and the index is asked for a
/// hybrid ranking with the configured semantic ratio.
pub async fn execute_search<I, E>(
    index: &I,
    embedder: &E,
    config: &SearchConfig,
    request: &SearchRequest,
) -> Result<SearchResponse, ProspectError>
where
    I: SearchIndex,
    E: Embedder,
{
    let (hybrid, vector) = if request.vector {
        let embedding = embedder.embed(&request.query).await?;
        (
            Some(HybridQuery {
                semantic_ratio: config.semantic_ratio,
                embedder: DEFAULT_EMBEDDER.to_string(),
            }),
            Some(embedding),
        )
    } else {
        (None, None)
    };

    let query = SearchQuery {
        q: request.query.clone(),
        limit: request.limit,
        offset: request.offset,
        filter: request.filter_expression()?,
        hybrid,
        vector,
    };

    let uid = request.search_type.index_name(config);
    tracing::debug!("Searching {} for {:?}", uid, request.query);
    let results = index.search(uid, &query).await?;

    Ok(SearchResponse {
        hits: results.hits,
        estimated_total_hits: results.estimated_total_hits,
        limit: results.limit.unwrap_or(request.limit),
        offset: results.offset.unwrap_or(request.offset),
        processing_time_ms: results.processing_time_ms,
        query: request.query.clone(),
    })
}

/// Validates raw parameters and runs the search
///
/// Invalid parameters are rejected before the embedder or the index is called.
pub async fn search_with_params<I, E>(
    index: &I,
    embedder: &E,
    config: &SearchConfig,
    params: &HashMap<String, String>,
) -> Result<SearchResponse, ProspectError>
where
    I: SearchIndex,
    E: Embedder,
{
    let request = SearchRequest::from_params(params)?;
    execute_search(index, embedder, config, &request).await
}
