//! One-shot CLI commands: template, import and export.
//!
//! These run against the same services as the NATS handlers, with the
//! caller identified by a profile id instead of a token.

use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tracing::info;
use uuid::Uuid;

use crate::cli::ExportArgs;
use crate::services::progress::LogProgress;
use crate::services::roll_export::RollExporter;
use crate::services::roll_import::{error_report_csv, template_csv, RollImporter, TEMPLATE_FILENAME};
use crate::store::RollStore;
use crate::types::{ExportRequest, ImportFile, ValidationOutcome};

/// Options of the `import` command
pub struct ImportCommand<'a> {
    pub file: &'a Path,
    pub user: Uuid,
    pub dry_run: bool,
    pub yes: bool,
    pub report: Option<&'a Path>,
}

/// Write the import template and return where it went.
pub fn write_template(output: Option<PathBuf>) -> Result<PathBuf> {
    let path = output.unwrap_or_else(|| PathBuf::from(TEMPLATE_FILENAME));
    std::fs::write(&path, template_csv()?)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    println!("Plantilla escrita en {}", path.display());
    Ok(path)
}

/// Validate a roll file and, unless it is a dry run, import it.
pub async fn import(
    store: Arc<dyn RollStore>,
    importer: &RollImporter,
    cmd: &ImportCommand<'_>,
    input: &mut dyn BufRead,
) -> Result<()> {
    let session = store
        .load_session(cmd.user)
        .await
        .with_context(|| format!("Unknown user {}", cmd.user))?;

    let bytes = std::fs::read(cmd.file)
        .with_context(|| format!("Failed to read {}", cmd.file.display()))?;
    let filename = cmd
        .file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| cmd.file.display().to_string());
    let file = ImportFile::new(filename, bytes);

    let outcome = importer.validate(&file).await?;
    print_summary(&outcome);

    if !outcome.is_clean() {
        if let Some(path) = cmd.report {
            std::fs::write(path, error_report_csv(&outcome.issues)?)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Reporte de errores escrito en {}", path.display());
        }
        bail!("Validation failed with {} issues; nothing was imported", outcome.issue_count);
    }

    if cmd.dry_run {
        println!("Validación correcta. Sin cambios (--dry-run).");
        return Ok(());
    }

    let question = format!("¿Importar {} filas al padrón?", outcome.valid_rows);
    if !cmd.yes && !confirm(&question, input)? {
        println!("Importación cancelada.");
        return Ok(());
    }

    let result = importer.commit(&file, &session, &LogProgress).await?;
    println!(
        "Importación completa: {} nuevos, {} actualizados en {} lotes",
        result.inserted, result.updated, result.batches
    );
    if let Some(warning) = &result.stats_warning {
        println!("Aviso: estadísticas de mesa sin actualizar: {}", warning);
    }

    Ok(())
}

/// Export the roll into `output_dir`, returning the written path.
pub async fn export(
    store: Arc<dyn RollStore>,
    args: &ExportArgs,
    input: &mut dyn BufRead,
) -> Result<Option<PathBuf>> {
    let session = store
        .load_session(args.user)
        .await
        .with_context(|| format!("Unknown user {}", args.user))?;
    let exporter = RollExporter::new(store);

    let filter = args.filter();
    let preflight = exporter.preflight(&filter, &session).await?;
    println!("Filas a exportar: {}", preflight.count);

    let mut confirmed = args.yes;
    if preflight.needs_confirmation && !confirmed {
        let question = format!("La exportación incluye {} filas. ¿Continuar?", preflight.count);
        if !confirm(&question, input)? {
            println!("Exportación cancelada.");
            return Ok(None);
        }
        confirmed = true;
    }

    let request = ExportRequest {
        filter,
        mode: args.mode.into(),
        format: args.format.into(),
        confirmed,
    };
    let file = exporter.export(&request, &session, &LogProgress).await?;

    std::fs::create_dir_all(&args.output_dir)
        .with_context(|| format!("Failed to create {}", args.output_dir.display()))?;
    let path = args.output_dir.join(&file.filename);
    std::fs::write(&path, &file.bytes)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    info!("Export written to {} ({} rows)", path.display(), file.rows);
    println!("{} filas exportadas a {}", file.rows, path.display());
    Ok(Some(path))
}

fn print_summary(outcome: &ValidationOutcome) {
    println!(
        "{}: {} filas, {} válidas, {} problemas",
        outcome.filename, outcome.total_rows, outcome.valid_rows, outcome.issue_count
    );
    for issue in &outcome.preview {
        println!(
            "  fila {} [{}] {}: {}",
            issue.row_number, issue.field, issue.value, issue.message
        );
    }
    if outcome.truncated() {
        println!("  ... y {} más", outcome.issue_count - outcome.preview.len());
    }
}

fn confirm(question: &str, input: &mut dyn BufRead) -> Result<bool> {
    print!("{} [s/N] ", question);
    std::io::stdout().flush()?;
    let mut answer = String::new();
    input.read_line(&mut answer).context("Failed to read answer")?;
    Ok(is_affirmative(&answer))
}

fn is_affirmative(answer: &str) -> bool {
    matches!(
        answer.trim().to_lowercase().as_str(),
        "s" | "si" | "sí" | "y" | "yes"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{FormatArg, ModeArg, VoteArg};
    use crate::services::roll_import::ImportOptions;
    use crate::store::memory::MemoryStore;
    use crate::types::{RollRecord, UserProfile, TIER_SUPERVISOR};
    use std::io::Cursor;
    use std::time::Duration;

    const CSV: &str = "documento,apellido,nombre,sexo,clase,domicilio,mesa_numero,orden\n\
                       12345678,GARCIA,JUAN,M,1985,CALLE 1,1000,1\n";

    fn scratch_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("pickpad-{}", Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn store_with_supervisor() -> (Arc<MemoryStore>, Uuid) {
        let store = Arc::new(MemoryStore::with_mesas([1000]));
        let id = Uuid::new_v4();
        store.add_profile(UserProfile {
            id,
            nombre: "Supervisor".to_string(),
            role_tier: TIER_SUPERVISOR,
            mesa_numero: None,
        });
        (store, id)
    }

    fn importer(store: &Arc<MemoryStore>) -> RollImporter {
        let options = ImportOptions {
            batch_pause: Duration::ZERO,
            ..Default::default()
        };
        RollImporter::new(store.clone(), options)
    }

    fn export_args(user: Uuid, output_dir: PathBuf, yes: bool) -> ExportArgs {
        ExportArgs {
            user,
            output_dir,
            mode: ModeArg::Raw,
            format: FormatArg::Csv,
            vote_status: VoteArg::All,
            emopick: None,
            mesa_from: None,
            mesa_to: None,
            clase_from: None,
            clase_to: None,
            yes,
        }
    }

    #[test]
    fn test_affirmative_answers() {
        assert!(is_affirmative("s\n"));
        assert!(is_affirmative(" Sí "));
        assert!(is_affirmative("YES"));
        assert!(!is_affirmative(""));
        assert!(!is_affirmative("n"));
        assert!(!is_affirmative("quizás"));
    }

    #[test]
    fn test_write_template_to_path() {
        let path = scratch_dir().join("plantilla.csv");
        let written = write_template(Some(path.clone())).unwrap();
        assert_eq!(written, path);
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("documento,apellido"));
    }

    #[tokio::test]
    async fn test_import_dry_run_writes_nothing() {
        let (store, user) = store_with_supervisor();
        let path = scratch_dir().join("padron.csv");
        std::fs::write(&path, CSV).unwrap();
        let cmd = ImportCommand { file: &path, user, dry_run: true, yes: false, report: None };

        import(store.clone(), &importer(&store), &cmd, &mut Cursor::new(""))
            .await
            .unwrap();
        assert_eq!(store.roll_len(), 0);
    }

    #[tokio::test]
    async fn test_import_declined_prompt_writes_nothing() {
        let (store, user) = store_with_supervisor();
        let path = scratch_dir().join("padron.csv");
        std::fs::write(&path, CSV).unwrap();
        let cmd = ImportCommand { file: &path, user, dry_run: false, yes: false, report: None };

        import(store.clone(), &importer(&store), &cmd, &mut Cursor::new("n\n"))
            .await
            .unwrap();
        assert_eq!(store.roll_len(), 0);
    }

    #[tokio::test]
    async fn test_import_confirmed_writes_roll() {
        let (store, user) = store_with_supervisor();
        let path = scratch_dir().join("padron.csv");
        std::fs::write(&path, CSV).unwrap();
        let cmd = ImportCommand { file: &path, user, dry_run: false, yes: false, report: None };

        import(store.clone(), &importer(&store), &cmd, &mut Cursor::new("s\n"))
            .await
            .unwrap();
        assert_eq!(store.record(12345678).unwrap().nombre, "JUAN");
    }

    #[tokio::test]
    async fn test_import_with_issues_writes_report() {
        let (store, user) = store_with_supervisor();
        let dir = scratch_dir();
        let path = dir.join("padron.csv");
        let report = dir.join("errores.csv");
        std::fs::write(&path, CSV.replace(",M,", ",Z,")).unwrap();
        let cmd = ImportCommand { file: &path, user, dry_run: false, yes: true, report: Some(&report) };

        let err = import(store.clone(), &importer(&store), &cmd, &mut Cursor::new(""))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("1 issues"));
        let text = std::fs::read_to_string(&report).unwrap();
        assert!(text.contains("sexo"));
        assert_eq!(store.roll_len(), 0);
    }

    #[tokio::test]
    async fn test_import_unknown_user_fails() {
        let (store, _) = store_with_supervisor();
        let path = scratch_dir().join("padron.csv");
        std::fs::write(&path, CSV).unwrap();
        let cmd = ImportCommand { file: &path, user: Uuid::new_v4(), dry_run: true, yes: false, report: None };

        assert!(import(store.clone(), &importer(&store), &cmd, &mut Cursor::new(""))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_export_writes_file() {
        let (store, user) = store_with_supervisor();
        store.seed([RollRecord::sample(1, Some(1000)), RollRecord::sample(2, Some(1000))]);
        let dir = scratch_dir();

        let path = export(store, &export_args(user, dir.clone(), false), &mut Cursor::new(""))
            .await
            .unwrap()
            .unwrap();
        assert!(path.starts_with(&dir));
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 3);
    }

    #[tokio::test]
    async fn test_export_above_threshold_asks_first() {
        let (store, user) = store_with_supervisor();
        *store.count_override.lock() = Some(60_000);

        let written = export(store.clone(), &export_args(user, scratch_dir(), false), &mut Cursor::new("no\n"))
            .await
            .unwrap();
        assert!(written.is_none());
        assert_eq!(store.pages(), 0);
    }
}
