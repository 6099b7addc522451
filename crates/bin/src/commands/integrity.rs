//! Integrity commands: check and rebuild.

use canopy::tree::IntegrityReport;

use crate::backend::Session;
use crate::cli::{CheckArgs, ScopeArgs};
use crate::output::{OutputFormat, print_table};

type CmdResult = Result<(), Box<dyn std::error::Error>>;

/// Run the check command
///
/// Fails when any audited tree is inconsistent, so scripts can rely on the
/// exit status.
pub fn check(session: &Session, args: &CheckArgs, format: OutputFormat) -> CmdResult {
    let scopes = match &args.entity_type {
        Some(entity_type) => vec![session.forest.resolve(entity_type, &args.context)?],
        None => session.forest.scopes()?,
    };

    let mut reports: Vec<IntegrityReport> = Vec::with_capacity(scopes.len());
    for scope in &scopes {
        reports.push(session.forest.check(scope)?);
    }

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string(&reports)?),
        OutputFormat::Human => {
            if reports.is_empty() {
                println!("No trees found.");
            }
            for report in &reports {
                println!("{report}");
            }
        }
    }

    let broken = reports.iter().filter(|r| !r.is_consistent()).count();
    if broken > 0 {
        return Err(format!("{broken} tree(s) failed the integrity check").into());
    }
    Ok(())
}

/// Run the rebuild command
pub fn rebuild(session: &Session, args: &ScopeArgs, format: OutputFormat) -> CmdResult {
    let scope = session.scope(args)?;
    let changed = session.forest.rebuild(&scope)?;
    session.save()?;

    match format {
        OutputFormat::Json => {
            let value = serde_json::json!({
                "scope": scope,
                "changed": changed,
            });
            println!("{}", serde_json::to_string(&value)?);
        }
        OutputFormat::Human => {
            print_table(
                &["SCOPE", "RENUMBERED"],
                &[vec![scope.to_string(), changed.to_string()]],
            );
        }
    }
    Ok(())
}
