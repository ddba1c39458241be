//! Search query builder for the content store

use crate::error::{Error, Result};

/// A single query predicate, e.g. `[at(document.type, "post")]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Predicate(String);

impl Predicate {
    /// Exact match on a field path
    pub fn at(path: &str, value: &str) -> Self {
        Predicate(format!("[at({}, \"{}\")]", path, escape_value(value)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Sort order on one field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ordering {
    pub field: String,
    pub descending: bool,
}

impl Ordering {
    pub fn asc(field: &str) -> Self {
        Self {
            field: field.to_string(),
            descending: false,
        }
    }

    pub fn desc(field: &str) -> Self {
        Self {
            field: field.to_string(),
            descending: true,
        }
    }
}

/// Field ordering by first publication date
pub const FIRST_PUBLICATION_DATE: &str = "document.first_publication_date";

/// A search against the content store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub predicates: Vec<Predicate>,
    pub fetch: Vec<String>,
    pub page_size: usize,
    pub after: Option<String>,
    pub orderings: Vec<Ordering>,
    /// Content ref; `None` means the published (master) ref
    pub reference: Option<String>,
}

impl Default for Query {
    fn default() -> Self {
        Self {
            predicates: Vec::new(),
            fetch: Vec::new(),
            page_size: 20,
            after: None,
            orderings: Vec::new(),
            reference: None,
        }
    }
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// All documents of one custom type
    pub fn of_type(doc_type: &str) -> Self {
        Self::new().predicate(Predicate::at("document.type", doc_type))
    }

    pub fn predicate(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    /// Restrict returned `data` to `<type>.<field>` entries
    pub fn fetch_fields(mut self, doc_type: &str, fields: &[&str]) -> Self {
        self.fetch
            .extend(fields.iter().map(|f| format!("{}.{}", doc_type, f)));
        self
    }

    pub fn page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn after(mut self, document_id: &str) -> Self {
        self.after = Some(document_id.to_string());
        self
    }

    pub fn order_by(mut self, ordering: Ordering) -> Self {
        self.orderings.push(ordering);
        self
    }

    pub fn with_ref(mut self, reference: Option<&str>) -> Self {
        self.reference = reference.map(str::to_string);
        self
    }

    /// Reject queries the store would refuse
    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            return Err(Error::InvalidQuery(
                "page size must be greater than zero".to_string(),
            ));
        }
        if self.predicates.is_empty() {
            return Err(Error::InvalidQuery("at least one predicate is required".to_string()));
        }
        Ok(())
    }

    /// The `q` parameter: `[[at(...)][at(...)]]`
    pub fn q(&self) -> String {
        let inner: String = self.predicates.iter().map(Predicate::as_str).collect();
        format!("[{}]", inner)
    }

    /// The `orderings` parameter: `[field desc,other]`
    pub fn orderings_param(&self) -> Option<String> {
        if self.orderings.is_empty() {
            return None;
        }
        let fields: Vec<String> = self
            .orderings
            .iter()
            .map(|o| {
                if o.descending {
                    format!("{} desc", o.field)
                } else {
                    o.field.clone()
                }
            })
            .collect();
        Some(format!("[{}]", fields.join(",")))
    }

    /// Search parameters, excluding `ref` and `access_token`
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("q", self.q()),
            ("pageSize", self.page_size.to_string()),
        ];
        if !self.fetch.is_empty() {
            params.push(("fetch", self.fetch.join(",")));
        }
        if let Some(orderings) = self.orderings_param() {
            params.push(("orderings", orderings));
        }
        if let Some(after) = &self.after {
            params.push(("after", after.clone()));
        }
        params
    }
}

fn escape_value(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
