//! Built-in stream catalog
//!
//! The static set of Visma.net ERP entities the tap extracts, and their
//! Singer catalog rendering for discovery.

use crate::config::TapConfig;
use crate::error::{Error, Result};
use crate::schema::{FieldType, Property, Schema};
use crate::stream::{Partition, StreamDefinition};
use serde_json::{json, Value};

/// Replication key shared by every built-in stream
pub const LAST_MODIFIED: &str = "lastModifiedDateTime";

/// Branch queried by the budget stream
pub const BUDGET_BRANCH: &str = "1";

/// Ledger queried by the budget stream
pub const BUDGET_LEDGER: &str = "1";

/// Set of stream definitions
#[derive(Debug, Clone)]
pub struct Catalog {
    streams: Vec<StreamDefinition>,
}

impl Catalog {
    /// Catalog from explicit definitions; stream names must be unique
    pub fn new(streams: Vec<StreamDefinition>) -> Result<Self> {
        for (i, stream) in streams.iter().enumerate() {
            if streams[..i].iter().any(|s| s.name() == stream.name()) {
                return Err(Error::config(format!(
                    "Duplicate stream name '{}'",
                    stream.name()
                )));
            }
        }
        Ok(Self { streams })
    }

    /// The built-in Visma.net ERP streams
    pub fn builtin(config: &TapConfig) -> Result<Self> {
        Self::new(vec![
            department()?,
            account()?,
            customer()?,
            general_ledger_balance()?,
            budget(&config.financial_years())?,
        ])
    }

    /// All streams, in declaration order
    pub fn streams(&self) -> &[StreamDefinition] {
        &self.streams
    }

    /// Stream names, in declaration order
    pub fn names(&self) -> Vec<&str> {
        self.streams.iter().map(StreamDefinition::name).collect()
    }

    /// Look up a stream by name
    pub fn get(&self, name: &str) -> Option<&StreamDefinition> {
        self.streams.iter().find(|s| s.name() == name)
    }

    /// Streams to run, in the order given; an empty selection means all.
    /// Unknown or repeated names are rejected.
    pub fn select(&self, names: &[String]) -> Result<Vec<&StreamDefinition>> {
        if names.is_empty() {
            return Ok(self.streams.iter().collect());
        }
        let mut selected: Vec<&StreamDefinition> = Vec::with_capacity(names.len());
        for name in names {
            let stream = self.get(name).ok_or_else(|| Error::StreamNotFound {
                stream: name.clone(),
            })?;
            if selected.iter().any(|s| s.name() == stream.name()) {
                return Err(Error::config(format!(
                    "Stream '{name}' selected more than once"
                )));
            }
            selected.push(stream);
        }
        Ok(selected)
    }

    /// Singer catalog document
    pub fn to_json(&self) -> Value {
        let streams: Vec<Value> = self.streams.iter().map(catalog_entry).collect();
        json!({ "streams": streams })
    }
}

fn catalog_entry(stream: &StreamDefinition) -> Value {
    let method = stream.replication_method();
    let mut metadata = json!({
        "inclusion": "available",
        "selected": true,
        "table-key-properties": stream.primary_keys(),
        "forced-replication-method": method,
    });
    if let Some(key) = stream.replication_key() {
        metadata["valid-replication-keys"] = json!([key]);
    }

    let mut entry = json!({
        "tap_stream_id": stream.name(),
        "stream": stream.name(),
        "schema": stream.schema().to_json_schema(),
        "key_properties": stream.primary_keys(),
        "replication_method": method,
        "metadata": [{"breadcrumb": [], "metadata": metadata}],
    });
    if let Some(key) = stream.replication_key() {
        entry["replication_key"] = json!(key);
    }
    entry
}

// ============================================================================
// Stream Definitions
// ============================================================================

fn id_description() -> FieldType {
    FieldType::object([
        Property::new("id", FieldType::String),
        Property::new("description", FieldType::String),
    ])
}

fn number_description() -> FieldType {
    FieldType::object([
        Property::new("number", FieldType::String),
        Property::new("description", FieldType::String),
    ])
}

fn department() -> Result<StreamDefinition> {
    StreamDefinition::builder("department", "/controller/api/v1/department")
        .primary_keys(["departmentId"])
        .replication_key(LAST_MODIFIED)
        .schema(
            Schema::new()
                .property("departmentId", FieldType::String)
                .property("publicId", FieldType::String)
                .property("description", FieldType::String)
                .property(
                    "expenseSubaccount",
                    FieldType::object([Property::new("id", FieldType::String)]),
                )
                .property(LAST_MODIFIED, FieldType::DateTime),
        )
        .build()
}

fn account() -> Result<StreamDefinition> {
    StreamDefinition::builder("account", "/controller/api/v1/account")
        .primary_keys(["accountID"])
        .replication_key(LAST_MODIFIED)
        .schema(
            Schema::new()
                .with(Property::required("accountID", FieldType::Integer))
                .property("accountCD", FieldType::String)
                .property("accountGroupCD", FieldType::String)
                .property("accountClass", FieldType::String)
                .property("type", FieldType::String)
                .property("active", FieldType::Boolean)
                .property("description", FieldType::String)
                .property("postOption", FieldType::String)
                .property("currencyId", FieldType::String)
                .property("externalCode1", FieldType::String)
                .property("externalCode2", FieldType::String)
                .property("taxCategory", number_description())
                .property(LAST_MODIFIED, FieldType::DateTime),
        )
        .build()
}

fn customer() -> Result<StreamDefinition> {
    let address = FieldType::object([
        Property::new("addressLine1", FieldType::String),
        Property::new("addressLine2", FieldType::String),
        Property::new("postalCode", FieldType::String),
        Property::new("city", FieldType::String),
        Property::new(
            "country",
            FieldType::object([
                Property::new("id", FieldType::String),
                Property::new("name", FieldType::String),
            ]),
        ),
    ]);

    StreamDefinition::builder("customer", "/controller/api/v1/customer")
        .primary_keys(["internalId"])
        .replication_key(LAST_MODIFIED)
        .schema(
            Schema::new()
                .with(Property::required("internalId", FieldType::Integer))
                .property("number", FieldType::String)
                .property("name", FieldType::String)
                .property("status", FieldType::String)
                .property("corporateId", FieldType::String)
                .property("vatRegistrationId", FieldType::String)
                .property("currencyId", FieldType::String)
                .property("creditTerms", id_description())
                .property("mainAddress", address)
                .property("createdDateTime", FieldType::DateTime)
                .property(LAST_MODIFIED, FieldType::DateTime),
        )
        .build()
}

fn general_ledger_balance() -> Result<StreamDefinition> {
    StreamDefinition::builder(
        "general_ledger_balance",
        "/controller/api/v1/generalLedgerBalance",
    )
    .primary_keys([
        "account__number",
        "subaccount__id",
        "ledger__number",
        "financialPeriod",
    ])
    .replication_key(LAST_MODIFIED)
    .schema(
        Schema::new()
            .property(
                "account",
                FieldType::object([
                    Property::new("number", FieldType::String),
                    Property::new("type", FieldType::String),
                    Property::new("description", FieldType::String),
                ]),
            )
            .property("subaccount", id_description())
            .property("ledger", number_description())
            .property(
                "branch",
                FieldType::object([
                    Property::new("number", FieldType::String),
                    Property::new("name", FieldType::String),
                ]),
            )
            .property("financialPeriod", FieldType::String)
            .property("balanceType", FieldType::String)
            .property("currencyId", FieldType::String)
            .property("periodToDateDebit", FieldType::Number)
            .property("periodToDateCredit", FieldType::Number)
            .property("beginningBalance", FieldType::Number)
            .property("yearToDateBalance", FieldType::Number)
            .property("endingBalance", FieldType::Number)
            .property(LAST_MODIFIED, FieldType::DateTime),
    )
    .build()
}

fn budget(financial_years: &[i32]) -> Result<StreamDefinition> {
    let partitions = financial_years
        .iter()
        .map(|year| Partition::new().with_value("financialYear", *year))
        .collect();

    let period = FieldType::object([
        Property::new("periodId", FieldType::String),
        Property::new("amount", FieldType::Number),
    ]);

    StreamDefinition::builder("budget", "/controller/api/v1/budget")
        .primary_keys([
            "financialYear",
            "branchNumber__number",
            "ledger__number",
            "account__number",
            "subaccount__id",
        ])
        .replication_key(LAST_MODIFIED)
        .partitions(partitions)
        .param("branch", BUDGET_BRANCH)
        .param("ledger", BUDGET_LEDGER)
        .schema(
            Schema::new()
                .property("financialYear", FieldType::String)
                .property(
                    "branchNumber",
                    FieldType::object([
                        Property::new("number", FieldType::String),
                        Property::new("name", FieldType::String),
                    ]),
                )
                .property("ledger", number_description())
                .property("account", number_description())
                .property("subaccount", id_description())
                .property("description", FieldType::String)
                .property("amount", FieldType::Number)
                .property("distributedAmount", FieldType::Number)
                .property("periods", FieldType::array(period))
                .property(LAST_MODIFIED, FieldType::DateTime),
        )
        .build()
}
