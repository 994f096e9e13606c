//! Deployment and test run configuration.

use crate::catalog::domain::{Parameter, param_file};
use crate::error::{EngineError, EngineResult};
use crate::session::ConnectionConfig;
use camino::Utf8PathBuf;
use std::collections::BTreeMap;

/// Default maintenance database used for create/drop operations.
pub const DEFAULT_MAINTENANCE_DATABASE: &str = "postgres";

/// Request for a deployment run.
#[derive(Debug, Clone)]
pub struct DeploymentConfig {
    connection: ConnectionConfig,
    database: String,
    maintenance_database: String,
    source_path: Utf8PathBuf,
    overwrite: bool,
    force: bool,
    parameters: BTreeMap<String, String>,
    verbose: bool,
}

impl DeploymentConfig {
    /// Creates a configuration with defaults: maintenance database
    /// `postgres`, no overwrite, no parameters.
    #[must_use]
    pub fn new(
        connection: ConnectionConfig,
        database: impl Into<String>,
        source_path: impl Into<Utf8PathBuf>,
    ) -> Self {
        Self {
            connection,
            database: database.into(),
            maintenance_database: DEFAULT_MAINTENANCE_DATABASE.to_owned(),
            source_path: source_path.into(),
            overwrite: false,
            force: false,
            parameters: BTreeMap::new(),
            verbose: false,
        }
    }

    /// Overrides the maintenance database.
    #[must_use]
    pub fn with_maintenance_database(mut self, name: impl Into<String>) -> Self {
        self.maintenance_database = name.into();
        self
    }

    /// Requests drop-and-recreate of an existing target.
    #[must_use]
    pub const fn overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// Suppresses the approval prompt for overwrites.
    #[must_use]
    pub const fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// Adds one deployment parameter.
    #[must_use]
    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    /// Replaces the parameter map.
    #[must_use]
    pub fn with_parameters(mut self, parameters: BTreeMap<String, String>) -> Self {
        self.parameters = parameters;
        self
    }

    /// Merges parameters parsed from `KEY=VALUE` file content; later
    /// entries win over earlier ones.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Catalog`] citing the malformed line.
    pub fn with_parameter_file(mut self, content: &str) -> EngineResult<Self> {
        for (key, value) in param_file::parse(content)? {
            self.parameters.insert(key, value);
        }
        Ok(self)
    }

    /// Raises server message verbosity on the session.
    #[must_use]
    pub const fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Server connection settings.
    #[must_use]
    pub const fn connection(&self) -> &ConnectionConfig {
        &self.connection
    }

    /// Target database name.
    #[must_use]
    pub fn database(&self) -> &str {
        &self.database
    }

    /// Maintenance database name.
    #[must_use]
    pub fn maintenance_database(&self) -> &str {
        &self.maintenance_database
    }

    /// Source directory.
    #[must_use]
    pub fn source_path(&self) -> &Utf8PathBuf {
        &self.source_path
    }

    /// Whether an existing target may be dropped.
    #[must_use]
    pub const fn is_overwrite(&self) -> bool {
        self.overwrite
    }

    /// Whether the approval prompt is suppressed.
    #[must_use]
    pub const fn is_force(&self) -> bool {
        self.force
    }

    /// The raw parameter map.
    #[must_use]
    pub const fn parameters(&self) -> &BTreeMap<String, String> {
        &self.parameters
    }

    /// Whether verbose mode is requested.
    #[must_use]
    pub const fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// Rejects incomplete configurations.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidConfig`] for a missing connection
    /// string, database name, or source path.
    pub fn validate(&self) -> EngineResult<()> {
        validate_common(
            self.connection.connection_string(),
            &self.database,
            &self.source_path,
        )
    }

    /// Validates the parameter map into catalog parameters.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidParameterKey`] for the first invalid
    /// key; nothing has touched the database at that point.
    pub(crate) fn validated_parameters(&self) -> EngineResult<Vec<Parameter>> {
        build_parameters(&self.parameters)
    }
}

/// Request for a test run.
#[derive(Debug, Clone)]
pub struct TestConfig {
    connection: ConnectionConfig,
    database: String,
    source_path: Utf8PathBuf,
    parameters: BTreeMap<String, String>,
    verbose: bool,
    filter: Option<String>,
    list_only: bool,
}

impl TestConfig {
    /// Creates a configuration with no filter, executing (not listing).
    #[must_use]
    pub fn new(
        connection: ConnectionConfig,
        database: impl Into<String>,
        source_path: impl Into<Utf8PathBuf>,
    ) -> Self {
        Self {
            connection,
            database: database.into(),
            source_path: source_path.into(),
            parameters: BTreeMap::new(),
            verbose: false,
            filter: None,
            list_only: false,
        }
    }

    /// Restricts the run to scripts whose path matches a POSIX regular
    /// expression.
    #[must_use]
    pub fn with_filter(mut self, pattern: impl Into<String>) -> Self {
        self.filter = Some(pattern.into());
        self
    }

    /// Prints the plan instead of executing it.
    #[must_use]
    pub const fn list_only(mut self, list_only: bool) -> Self {
        self.list_only = list_only;
        self
    }

    /// Replaces the parameter map.
    #[must_use]
    pub fn with_parameters(mut self, parameters: BTreeMap<String, String>) -> Self {
        self.parameters = parameters;
        self
    }

    /// Merges parameters parsed from `KEY=VALUE` file content; later
    /// entries win over earlier ones.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Catalog`] citing the malformed line.
    pub fn with_parameter_file(mut self, content: &str) -> EngineResult<Self> {
        for (key, value) in param_file::parse(content)? {
            self.parameters.insert(key, value);
        }
        Ok(self)
    }

    /// Raises server message verbosity on the session.
    #[must_use]
    pub const fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Server connection settings.
    #[must_use]
    pub const fn connection(&self) -> &ConnectionConfig {
        &self.connection
    }

    /// Target database name.
    #[must_use]
    pub fn database(&self) -> &str {
        &self.database
    }

    /// Source directory.
    #[must_use]
    pub fn source_path(&self) -> &Utf8PathBuf {
        &self.source_path
    }

    /// The filter pattern, when set.
    #[must_use]
    pub fn filter(&self) -> Option<&str> {
        self.filter.as_deref()
    }

    /// Whether this is a list-only run.
    #[must_use]
    pub const fn is_list_only(&self) -> bool {
        self.list_only
    }

    /// Whether verbose mode is requested.
    #[must_use]
    pub const fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// Rejects incomplete configurations.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidConfig`] for a missing connection
    /// string, database name, or source path.
    pub fn validate(&self) -> EngineResult<()> {
        validate_common(
            self.connection.connection_string(),
            &self.database,
            &self.source_path,
        )
    }

    /// Validates the parameter map into catalog parameters.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidParameterKey`] for the first invalid
    /// key.
    pub(crate) fn validated_parameters(&self) -> EngineResult<Vec<Parameter>> {
        build_parameters(&self.parameters)
    }
}

fn validate_common(
    connection_string: &str,
    database: &str,
    source_path: &Utf8PathBuf,
) -> EngineResult<()> {
    if connection_string.trim().is_empty() {
        return Err(EngineError::InvalidConfig(
            "connection string is required".to_owned(),
        ));
    }
    if database.trim().is_empty() {
        return Err(EngineError::InvalidConfig(
            "target database name is required".to_owned(),
        ));
    }
    if source_path.as_str().trim().is_empty() {
        return Err(EngineError::InvalidConfig(
            "source path is required".to_owned(),
        ));
    }
    Ok(())
}

fn build_parameters(map: &BTreeMap<String, String>) -> EngineResult<Vec<Parameter>> {
    map.iter()
        .map(|(key, value)| Parameter::new(key.clone(), value.clone()).map_err(EngineError::from))
        .collect()
}
