use thiserror::Error;

/// One spreadsheet row: the raw phone number cell and the price cell. Ingestion format and transport are
/// the collaborator's business; blank or malformed rows are filtered out by the catalog module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogRow {
    pub raw_number: String,
    pub price: i64,
}

#[allow(async_fn_in_trait)]
pub trait CatalogSource: Clone {
    async fn fetch_rows(&self) -> Result<Vec<CatalogRow>, CatalogError>;
}

#[derive(Debug, Clone, Error)]
#[error("Catalog fetch failed: {0}")]
pub struct CatalogError(pub String);
