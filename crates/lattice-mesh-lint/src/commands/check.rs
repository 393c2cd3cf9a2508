//! Check command
//!
//! Loads DestinationRules from manifest files, treats them as one scope and
//! reports every rule that shares a host+subset combination with another.

use std::io::Read;
use std::path::{Path, PathBuf};

use clap::{Args, ValueEnum};
use tracing::{debug, info, warn};

use lattice_mesh_validation::yaml::parse_yaml_multi;
use lattice_mesh_validation::{IstioObject, MultiMatchChecker, ObjectChecker, Validations};

use super::format::print_table;
use crate::{Error, Result};

/// Path argument that reads manifests from stdin
const STDIN_PATH: &str = "-";

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Manifest files to check, in order (`-` reads from stdin)
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Namespace for manifests without metadata.namespace
    #[arg(
        short,
        long,
        default_value = "default",
        env = "LATTICE_MESH_NAMESPACE"
    )]
    pub namespace: String,

    /// Cluster for manifests without metadata.clusterName
    #[arg(long, default_value = "", env = "LATTICE_MESH_CLUSTER")]
    pub cluster: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub output: OutputFormat,

    /// Exit successfully even when conflicts are found
    #[arg(long)]
    pub allow_findings: bool,
}

/// Output format
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Columnar table (default)
    #[default]
    Table,
    /// JSON
    Json,
}

pub fn run(args: CheckArgs) -> Result<()> {
    let validations = check_files(&args.files, &args.namespace, &args.cluster)?;

    match args.output {
        OutputFormat::Table => print_validations_table(&validations),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&validations)?),
    }

    if validations.is_empty() || args.allow_findings {
        Ok(())
    } else {
        Err(Error::Findings {
            count: validations.len(),
        })
    }
}

/// Load every DestinationRule from `paths` and run the multi-match check
pub fn check_files(paths: &[PathBuf], namespace: &str, cluster: &str) -> Result<Validations> {
    let rules = load_destination_rules(paths, namespace, cluster)?;
    info!(files = paths.len(), rules = rules.len(), "checking DestinationRules");
    Ok(MultiMatchChecker::new(&rules).check())
}

/// Load DestinationRules from manifest files, preserving file and document order.
///
/// Documents of other kinds are ignored. Documents that cannot be decoded
/// (not a mapping, no `metadata.name`) are skipped with a warning; a file that
/// is not valid YAML is an error.
pub fn load_destination_rules(
    paths: &[PathBuf],
    namespace: &str,
    cluster: &str,
) -> Result<Vec<IstioObject>> {
    let mut rules = Vec::new();

    for path in paths {
        let content = read_manifest(path)?;
        let documents =
            parse_yaml_multi(&content).map_err(|e| Error::invalid_manifest(path, e))?;

        for document in &documents {
            match IstioObject::from_value(document, namespace, cluster) {
                Ok(object) if object.is_destination_rule() => rules.push(object),
                Ok(object) => debug!(
                    kind = %object.kind,
                    name = %object.metadata.name,
                    "ignoring object that is not a DestinationRule"
                ),
                Err(e) => warn!(path = %path.display(), error = %e, "skipping undecodable document"),
            }
        }
    }

    Ok(rules)
}

fn read_manifest(path: &Path) -> Result<String> {
    if path == Path::new(STDIN_PATH) {
        let mut content = String::new();
        std::io::stdin()
            .read_to_string(&mut content)
            .map_err(|e| Error::read_manifest(path, e))?;
        return Ok(content);
    }

    std::fs::read_to_string(path).map_err(|e| Error::read_manifest(path, e))
}

fn validation_rows(validations: &Validations) -> Vec<Vec<String>> {
    validations
        .iter()
        .flat_map(|validation| {
            validation.checks.iter().map(|check| {
                vec![
                    validation.name.clone(),
                    validation.object_type.clone(),
                    check.severity.to_string(),
                    check.code.clone(),
                    check.path.clone(),
                    check.message.clone(),
                ]
            })
        })
        .collect()
}

fn print_validations_table(validations: &Validations) {
    if validations.is_empty() {
        println!("No conflicting DestinationRules found.");
        return;
    }

    print_table(
        &["NAME", "TYPE", "SEVERITY", "CHECK", "PATH", "MESSAGE"],
        &validation_rows(validations),
    );
}
