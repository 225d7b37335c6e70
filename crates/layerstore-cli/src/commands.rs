use std::fs;
use std::io::{self, Write};

use anyhow::Context;
use colored::Colorize;
use layerstore_config::{BaseShape, StoreBuilder, StoreRegistry};
use layerstore_core::{
    clear_store, copy_store, enter, sync_stores, BulkReport, DynStore, ObjectStore, StoreResult,
};
use tracing::debug;

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let Cli {
        command,
        config,
        store,
        ..
    } = cli;
    if let Command::Types = command {
        return cmd_types();
    }

    let builder = StoreBuilder::from_path(&config)
        .with_context(|| format!("failed to load {}", config.display()))?;
    let selected = builder.build_bytes(store.as_deref())?;
    let scope = enter(&*selected)?;
    debug!(store = ?store, "opened store");

    let result = match command {
        Command::Get(args) => cmd_get(&selected, args),
        Command::Put(args) => cmd_put(&selected, args),
        Command::Exists(args) => cmd_exists(&selected, args),
        Command::Delete(args) => cmd_delete(&selected, args),
        Command::Keys(args) => cmd_keys(&selected, args),
        Command::Copy(args) => cmd_copy(&builder, &selected, args),
        Command::Sync(args) => cmd_sync(&builder, &selected, args),
        Command::Clear => cmd_clear(&selected),
        Command::Types => cmd_types(),
    };
    let exited = scope.exit();
    result?;
    exited?;
    Ok(())
}

fn cmd_get(store: &DynStore, args: GetArgs) -> anyhow::Result<()> {
    let data = store.get(&args.key)?;
    match args.output {
        Some(path) => {
            fs::write(&path, &data)
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!(
                "{} {} ({} bytes) -> {}",
                "✓".green(),
                args.key.yellow(),
                data.len(),
                path.display()
            );
        }
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(&data)?;
            stdout.flush()?;
        }
    }
    Ok(())
}

fn cmd_put(store: &DynStore, args: PutArgs) -> anyhow::Result<()> {
    let data = match (args.file, args.data) {
        (Some(path), _) => {
            fs::read(&path).with_context(|| format!("failed to read {}", path.display()))?
        }
        (None, Some(text)) => text.into_bytes(),
        (None, None) => anyhow::bail!("either --file or --data is required"),
    };
    let size = data.len();
    store.put(&args.key, data)?;
    println!("{} Stored {} ({} bytes)", "✓".green(), args.key.yellow(), size);
    Ok(())
}

fn cmd_exists(store: &DynStore, args: KeyArgs) -> anyhow::Result<()> {
    if store.exists(&args.key)? {
        println!("{} {}", args.key.yellow(), "exists".green());
    } else {
        println!("{} {}", args.key.yellow(), "not found".red());
    }
    Ok(())
}

fn cmd_delete(store: &DynStore, args: KeyArgs) -> anyhow::Result<()> {
    store.delete(&args.key)?;
    println!("{} Deleted {}", "✓".green(), args.key.yellow());
    Ok(())
}

fn cmd_keys(store: &DynStore, args: KeysArgs) -> anyhow::Result<()> {
    let mut keys = match args.prefix.as_deref() {
        Some(prefix) => store.keys_with_prefix(prefix)?.collect::<StoreResult<Vec<_>>>()?,
        None => store.keys()?.collect::<StoreResult<Vec<_>>>()?,
    };
    keys.sort();
    for key in &keys {
        println!("{key}");
    }
    debug!(count = keys.len(), "listed keys");
    Ok(())
}

/// Build `name` and run `f` with it open.
fn with_target<T>(
    builder: &StoreBuilder,
    name: &str,
    f: impl FnOnce(&DynStore) -> StoreResult<T>,
) -> anyhow::Result<T> {
    let target = builder.build_bytes(Some(name))?;
    let scope = enter(&*target)?;
    let result = f(&target);
    let exited = scope.exit();
    let value = result?;
    exited?;
    Ok(value)
}

fn print_report(verb: &str, report: BulkReport) {
    println!(
        "{} {}: {} copied, {} skipped, {} deleted",
        "✓".green().bold(),
        verb,
        report.copied.to_string().bold(),
        report.skipped,
        report.deleted
    );
}

fn cmd_copy(builder: &StoreBuilder, store: &DynStore, args: CopyArgs) -> anyhow::Result<()> {
    let report = with_target(builder, &args.to, |target| {
        copy_store(&**store, &**target, !args.no_overwrite)
    })?;
    print_report(&format!("Copied to {}", args.to.yellow()), report);
    Ok(())
}

fn cmd_sync(builder: &StoreBuilder, store: &DynStore, args: SyncArgs) -> anyhow::Result<()> {
    let report = with_target(builder, &args.to, |target| {
        sync_stores(&**store, &**target, args.delete)
    })?;
    print_report(&format!("Synced to {}", args.to.yellow()), report);
    Ok(())
}

fn cmd_clear(store: &DynStore) -> anyhow::Result<()> {
    let report = clear_store(&**store)?;
    print_report("Cleared", report);
    Ok(())
}

fn describe(shape: &BaseShape) -> String {
    match shape {
        BaseShape::Leaf => "backend".to_string(),
        BaseShape::Single => "base: name".to_string(),
        BaseShape::List => "base: [names]".to_string(),
        BaseShape::Roles(roles) => format!("base: {{{}}}", roles.join(", ")),
    }
}

fn cmd_types() -> anyhow::Result<()> {
    let registry = StoreRegistry::with_builtins();
    for name in registry.names() {
        let shape = registry
            .get(name)
            .map(|store_type| describe(store_type.shape()))
            .unwrap_or_default();
        println!("{:<28} {}", name.bold(), shape.dimmed());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::path::Path;

    fn write_config(dir: &Path) -> std::path::PathBuf {
        let path = dir.join("stores.yaml");
        let yaml = format!(
            r#"
main: primary
stores:
  primary:
    type: FilesystemStore
    config:
      root_path: "{}"
  backup:
    type: SqliteStore
    config:
      db_path: "{}"
"#,
            dir.join("objects").display(),
            dir.join("backup.db").display()
        );
        fs::write(&path, yaml).unwrap();
        path
    }

    fn run(config: &Path, args: &[&str]) -> anyhow::Result<()> {
        let config = config.to_str().unwrap();
        let mut argv = vec!["layerstore", "--config", config];
        argv.extend_from_slice(args);
        run_command(Cli::try_parse_from(argv).unwrap())
    }

    #[test]
    fn put_get_delete_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let config = write_config(dir.path());

        run(&config, &["put", "docs/readme", "--data", "hello"]).unwrap();
        assert_eq!(fs::read(dir.path().join("objects/docs/readme")).unwrap(), b"hello");

        let out = dir.path().join("out.txt");
        run(&config, &["get", "docs/readme", "--output", out.to_str().unwrap()]).unwrap();
        assert_eq!(fs::read(&out).unwrap(), b"hello");

        run(&config, &["exists", "docs/readme"]).unwrap();
        run(&config, &["keys", "--prefix", "docs/"]).unwrap();
        run(&config, &["delete", "docs/readme"]).unwrap();
        assert!(run(&config, &["get", "docs/readme"]).is_err());
    }

    #[test]
    fn put_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = write_config(dir.path());
        let input = dir.path().join("input.bin");
        fs::write(&input, [0u8, 159, 146, 150]).unwrap();

        run(&config, &["put", "blob", "--file", input.to_str().unwrap()]).unwrap();
        assert_eq!(
            fs::read(dir.path().join("objects/blob")).unwrap(),
            [0u8, 159, 146, 150]
        );
    }

    #[test]
    fn copy_sync_and_clear_between_definitions() {
        let dir = tempfile::tempdir().unwrap();
        let config = write_config(dir.path());
        run(&config, &["put", "a", "--data", "1"]).unwrap();
        run(&config, &["put", "b", "--data", "2"]).unwrap();

        run(&config, &["copy", "--to", "backup"]).unwrap();
        run(&config, &["--store", "backup", "exists", "a"]).unwrap();
        run(&config, &["delete", "a"]).unwrap();
        run(&config, &["sync", "--to", "backup", "--delete"]).unwrap();

        let builder = StoreBuilder::from_path(&config).unwrap();
        let backup = builder.build_bytes(Some("backup")).unwrap();
        let keys = layerstore_core::with_scope(&*backup, |store| {
            store.keys()?.collect::<StoreResult<Vec<_>>>()
        })
        .unwrap();
        assert_eq!(keys, vec!["b"]);

        run(&config, &["--store", "backup", "clear"]).unwrap();
    }

    #[test]
    fn missing_config_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let err = run(&dir.path().join("absent.yaml"), &["keys"]).unwrap_err();
        assert!(err.to_string().contains("absent.yaml"));
    }

    #[test]
    fn types_needs_no_config() {
        let cli = Cli::try_parse_from(["layerstore", "--config", "/nonexistent.yaml", "types"]).unwrap();
        cmd_types().unwrap();
        run_command(cli).unwrap();
    }

    #[test]
    fn describes_shapes() {
        assert_eq!(describe(&BaseShape::Leaf), "backend");
        assert_eq!(
            describe(&BaseShape::roles(["main_store", "cache_store"])),
            "base: {main_store, cache_store}"
        );
    }
}
