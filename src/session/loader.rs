//! Catalog loading onto the pinned connection.
//!
//! Load order is fixed by the schema's foreign keys: test directories
//! (parents before children), then test files, then non-test files through
//! the server-side register routine, then structured metadata. Parameter
//! keys are validated before the first database write.

use super::{NAMESPACE, SessionError, SessionResult};
use crate::catalog::domain::{Parameter, ScannedFile, validate_parameter_key};
use diesel::RunQueryDsl;
use diesel::pg::PgConnection;
use diesel::sql_query;
use diesel::sql_types::{Array, Bool, Integer, Nullable, Text, Uuid as SqlUuid};
use std::collections::BTreeMap;

/// Loads scanned files and parameters into the session catalog.
pub trait SessionLoader: Send + Sync {
    /// Loads all scanned files, test and non-test alike.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Load`] naming the first offending path.
    fn load_files(&self, conn: &mut PgConnection, files: &[ScannedFile]) -> SessionResult<()>;

    /// Loads parameters and sets their runtime settings.
    ///
    /// Every key is validated before any write; an invalid key rejects the
    /// whole call.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Catalog`] for invalid keys and
    /// [`SessionError::Load`] naming the first offending key.
    fn load_parameters(
        &self,
        conn: &mut PgConnection,
        parameters: &[Parameter],
    ) -> SessionResult<()>;
}

/// Production loader issuing prepared statements through Diesel.
#[derive(Debug, Clone, Default)]
pub struct DieselSessionLoader;

impl DieselSessionLoader {
    /// Creates a loader.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl SessionLoader for DieselSessionLoader {
    fn load_files(&self, conn: &mut PgConnection, files: &[ScannedFile]) -> SessionResult<()> {
        let (test_files, source_files): (Vec<&ScannedFile>, Vec<&ScannedFile>) =
            files.iter().partition(|f| f.is_test());

        insert_test_directories(conn, &test_files)?;
        insert_test_files(conn, &test_files)?;
        register_source_files(conn, &source_files)?;
        insert_metadata(conn, &source_files)?;
        Ok(())
    }

    fn load_parameters(
        &self,
        conn: &mut PgConnection,
        parameters: &[Parameter],
    ) -> SessionResult<()> {
        for parameter in parameters {
            validate_parameter_key(parameter.key())?;
        }

        for parameter in parameters {
            let key = parameter.key_lower();
            sql_query(
                "INSERT INTO __pgmi_parameter \
                 (key, value, type_tag, required, default_value, description) \
                 VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .bind::<Text, _>(&key)
            .bind::<Text, _>(parameter.value())
            .bind::<Text, _>(parameter.type_tag().as_str())
            .bind::<Bool, _>(parameter.is_required())
            .bind::<Nullable<Text>, _>(parameter.default_value())
            .bind::<Nullable<Text>, _>(parameter.description())
            .execute(conn)
            .map_err(|source| SessionError::load(&key, source))?;

            sql_query("SELECT set_config($1, $2, false)")
                .bind::<Text, _>(format!("{NAMESPACE}.{key}"))
                .bind::<Text, _>(parameter.value())
                .execute(conn)
                .map_err(|source| SessionError::load(&key, source))?;
        }
        Ok(())
    }
}

/// Test directories owning a set of files, parents before children.
///
/// The chain starts at the outermost `__test__`/`__tests__` segment: for
/// `./a/__test__/b/t.sql` the directories are `./a/__test__/` (depth 0)
/// and `./a/__test__/b/` (depth 1).
fn test_directory_chain(files: &[&ScannedFile]) -> Vec<(String, Option<String>, i32)> {
    let mut directories: BTreeMap<String, (Option<String>, i32)> = BTreeMap::new();

    for file in files {
        let dir = file.directory();
        let segments: Vec<&str> = dir.trim_end_matches('/').split('/').collect();
        let Some(root_index) = segments
            .iter()
            .position(|s| *s == "__test__" || *s == "__tests__")
        else {
            continue;
        };

        for end in root_index..segments.len() {
            let joined: Vec<&str> = segments.iter().take(end + 1).copied().collect();
            let path = format!("{}/", joined.join("/"));
            let parent = if end == root_index {
                None
            } else {
                let parent_joined: Vec<&str> = segments.iter().take(end).copied().collect();
                Some(format!("{}/", parent_joined.join("/")))
            };
            let depth = i32::try_from(end - root_index).unwrap_or(i32::MAX);
            directories.entry(path).or_insert((parent, depth));
        }
    }

    let mut ordered: Vec<(String, Option<String>, i32)> = directories
        .into_iter()
        .map(|(path, (parent, depth))| (path, parent, depth))
        .collect();
    ordered.sort_by(|a, b| a.2.cmp(&b.2).then_with(|| a.0.cmp(&b.0)));
    ordered
}

fn insert_test_directories(conn: &mut PgConnection, files: &[&ScannedFile]) -> SessionResult<()> {
    for (path, parent, depth) in test_directory_chain(files) {
        sql_query(
            "INSERT INTO __pgmi_test_directory (path, parent_path, depth) \
             VALUES ($1, $2, $3)",
        )
        .bind::<Text, _>(&path)
        .bind::<Nullable<Text>, _>(parent)
        .bind::<Integer, _>(depth)
        .execute(conn)
        .map_err(|source| SessionError::load(&path, source))?;
    }
    Ok(())
}

fn insert_test_files(conn: &mut PgConnection, files: &[&ScannedFile]) -> SessionResult<()> {
    for file in files {
        sql_query(
            "INSERT INTO __pgmi_test_source (path, directory, name, content, is_fixture) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind::<Text, _>(file.path())
        .bind::<Text, _>(file.directory())
        .bind::<Text, _>(file.file_name())
        .bind::<Text, _>(file.content())
        .bind::<Bool, _>(file.is_fixture())
        .execute(conn)
        .map_err(|source| SessionError::load(file.path(), source))?;
    }
    Ok(())
}

fn register_source_files(conn: &mut PgConnection, files: &[&ScannedFile]) -> SessionResult<()> {
    // Derived fields are recomputed inside the register routine; the
    // client supplies only the path, content, and checksums.
    for file in files {
        sql_query("SELECT pg_temp.pgmi_register_file($1, $2, $3, $4)")
            .bind::<Text, _>(file.path())
            .bind::<Text, _>(file.content())
            .bind::<Text, _>(file.checksum_raw())
            .bind::<Text, _>(file.checksum_normalized())
            .execute(conn)
            .map_err(|source| SessionError::load(file.path(), source))?;
    }
    Ok(())
}

fn insert_metadata(conn: &mut PgConnection, files: &[&ScannedFile]) -> SessionResult<()> {
    for file in files {
        let Some(metadata) = file.metadata() else {
            continue;
        };
        sql_query(
            "INSERT INTO __pgmi_file_metadata (path, id, idempotent, sort_keys, description) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind::<Text, _>(file.path())
        .bind::<SqlUuid, _>(metadata.id)
        .bind::<Bool, _>(metadata.idempotent)
        .bind::<Array<Text>, _>(&metadata.sort_keys)
        .bind::<Nullable<Text>, _>(metadata.description.as_deref())
        .execute(conn)
        .map_err(|source| SessionError::load(file.path(), source))?;
    }
    Ok(())
}
