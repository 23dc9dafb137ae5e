//! File commands - read, write, create, delete and rename through the workspace.

use crate::app::App;
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

/// Print a file's content.
pub fn read(app: &App, file: &Path) -> anyhow::Result<()> {
    let content = app.workspace.read(&app.resolve(file))?;
    print!("{}", content);
    io::stdout().flush()?;
    Ok(())
}

/// Write content from `--from` or stdin.
pub fn write(app: &App, file: &Path, from: Option<PathBuf>) -> anyhow::Result<()> {
    let content = match from {
        Some(source) => fs::read_to_string(app.resolve(&source))?,
        None => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            buffer
        }
    };

    let file = app.resolve(file);
    app.workspace.write(&file, &content)?;

    let index = app.workspace.keywords();
    let declared = index.names_for(&file);
    println!("Wrote {} ({} bytes)", file.display(), content.len());
    if !declared.is_empty() {
        println!("Declares: {}", declared.join(", "));
    }

    Ok(())
}

/// Create a note from the template.
pub fn create(app: &App, file: &Path) -> anyhow::Result<()> {
    let file = app.resolve(file);
    app.workspace.create(&file)?;
    println!("Created {}", file.display());
    Ok(())
}

/// Create a directory.
pub fn mkdir(app: &App, dir: &Path) -> anyhow::Result<()> {
    let dir = app.resolve(dir);
    app.workspace.create_directory(&dir)?;
    println!("Created {}", dir.display());
    Ok(())
}

/// Delete a file, asking first unless `skip_confirm`.
pub fn delete(app: &App, file: &Path, skip_confirm: bool) -> anyhow::Result<()> {
    let file = app.resolve(file);

    if !skip_confirm {
        print!("Delete {}? [y/N] ", file.display());
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;

        if !input.trim().eq_ignore_ascii_case("y") {
            println!("Cancelled.");
            return Ok(());
        }
    }

    app.workspace.delete(&file)?;
    println!("Deleted {}", file.display());
    Ok(())
}

/// Rename or move a file or directory.
pub fn rename(app: &App, old: &Path, new: &Path) -> anyhow::Result<()> {
    let old = app.resolve(old);
    let new = app.resolve(new);
    app.workspace.rename(&old, &new)?;
    println!("Renamed {} -> {}", old.display(), new.display());
    Ok(())
}
