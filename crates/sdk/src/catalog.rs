use std::fmt::Write;

use regex::RegexBuilder;
use serde::Serialize;

use crate::operation::{Operation, OperationDefinition, OperationKind};

/// An HTTP route exposing an operation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ApiRoute {
    /// Upper case HTTP method.
    pub method: String,
    pub path: String,
    /// Name of the targeted operation.
    pub operation: &'static str,
}

impl ApiRoute {
    pub fn new(method: impl AsRef<str>, path: impl Into<String>, operation: &'static str) -> Self {
        ApiRoute {
            method: method.as_ref().to_ascii_uppercase(),
            path: path.into(),
            operation,
        }
    }

    /// Commands are exposed through POST, PUT or PATCH, queries through GET or DELETE.
    pub fn serves(&self, kind: OperationKind) -> bool {
        match kind {
            OperationKind::Command => matches!(self.method.as_str(), "POST" | "PUT" | "PATCH"),
            OperationKind::Query => matches!(self.method.as_str(), "GET" | "DELETE"),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CatalogFormat {
    #[default]
    Regular,
    Simple,
}

/// Lists known operations and whether the API exposes them.
#[derive(Clone, Debug, Default)]
pub struct Catalog {
    operations: Vec<OperationDefinition>,
    routes: Vec<ApiRoute>,
}

impl Catalog {
    pub fn new() -> Self {
        Catalog::default()
    }

    /// Adds `O` to the catalog unless it is already listed.
    pub fn add_operation<O: Operation>(&mut self) {
        if !self.operations.iter().any(|def| def.name == O::NAME) {
            self.operations.push(OperationDefinition::of::<O>());
        }
    }

    pub fn with_operation<O: Operation>(mut self) -> Self {
        self.add_operation::<O>();
        self
    }

    pub fn add_route(&mut self, route: ApiRoute) {
        self.routes.push(route);
    }

    pub fn operations(&self) -> &[OperationDefinition] {
        &self.operations
    }

    pub fn routes(&self) -> &[ApiRoute] {
        &self.routes
    }

    /// Keeps the operations whose qualified name matches any of the patterns,
    /// case insensitively. An empty pattern list keeps everything.
    pub fn filter_domains<S: AsRef<str>>(&mut self, patterns: &[S]) -> Result<(), regex::Error> {
        if patterns.is_empty() {
            return Ok(());
        }

        let alternation = patterns
            .iter()
            .map(|pattern| pattern.as_ref())
            .collect::<Vec<_>>()
            .join("|");
        let regex = RegexBuilder::new(&alternation)
            .case_insensitive(true)
            .build()?;

        self.operations
            .retain(|def| regex.is_match(&def.qualified_name()));
        Ok(())
    }

    /// Path of the route implementing the operation, if any.
    pub fn api_path(&self, def: &OperationDefinition) -> Option<&str> {
        self.routes
            .iter()
            .find(|route| route.operation == def.name && route.serves(def.kind))
            .map(|route| route.path.as_str())
    }

    pub fn render(&self, format: CatalogFormat) -> String {
        let mut out = String::new();

        for (index, def) in self.operations.iter().enumerate() {
            let api_path = self.api_path(def);
            // Writing to a String is infallible.
            let _ = match format {
                CatalogFormat::Simple => writeln!(
                    out,
                    "{} {}",
                    def.qualified_name(),
                    if api_path.is_some() { "OK" } else { "NOT OK" }
                ),
                CatalogFormat::Regular => writeln!(
                    out,
                    "{}.\nClass: {}\nType: {}\nAPI: {}\n{}\n",
                    index + 1,
                    def.qualified_name(),
                    def.kind,
                    api_path.unwrap_or_default(),
                    def.description,
                ),
            };
        }

        out
    }
}
