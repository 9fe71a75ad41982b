//! Man page generator
//!
//! Renders `rtlspi.1` plus one `rtlspi-<command>.1` page per subcommand
//! into the directory named by the first argument (default `man/`).

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use clap::{Command, CommandFactory};

#[path = "../cli.rs"]
mod cli;

/// Render one command as a section-1 page named after it
fn render_page(cmd: Command, dir: &Path) -> std::io::Result<PathBuf> {
    let path = dir.join(format!("{}.1", cmd.get_name()));
    let mut page = Vec::new();
    clap_mangen::Man::new(cmd).render(&mut page)?;
    fs::write(&path, page)?;
    Ok(path)
}

fn main() -> std::io::Result<()> {
    let dir = env::args().nth(1).unwrap_or_else(|| String::from("man"));
    let dir = PathBuf::from(dir);
    fs::create_dir_all(&dir)?;

    let root = cli::Cli::command();

    for sub in root.get_subcommands() {
        let name = format!("rtlspi-{}", sub.get_name());
        let path = render_page(sub.clone().name(name), &dir)?;
        println!("{}", path.display());
    }

    let root_page = render_page(root, &dir)?;
    println!("{}", root_page.display());
    println!("Proofread with: man -l {}", root_page.display());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_tree_is_well_formed() {
        cli::Cli::command().debug_assert();
    }

    #[test]
    fn test_every_subcommand_gets_a_page() {
        let root = cli::Cli::command();
        let names: Vec<String> = root
            .get_subcommands()
            .map(|sub| format!("rtlspi-{}", sub.get_name()))
            .collect();
        assert_eq!(names, ["rtlspi-regs", "rtlspi-id", "rtlspi-speed"]);
    }
}
