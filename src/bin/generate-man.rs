use clap::CommandFactory;
use clap_mangen::Man;
use filterq::cli::Cli;
use std::fs;
use std::io;
use std::path::PathBuf;

fn main() -> io::Result<()> {
    let out_dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("man"));
    fs::create_dir_all(&out_dir)?;

    let cmd = Cli::command();
    let mut buffer = Vec::new();
    Man::new(cmd.clone()).render(&mut buffer)?;
    fs::write(out_dir.join("filterq.1"), buffer)?;

    for sub in cmd.get_subcommands() {
        let name = format!("filterq-{}", sub.get_name());
        let mut buffer = Vec::new();
        Man::new(sub.clone().name(name.clone())).render(&mut buffer)?;
        fs::write(out_dir.join(format!("{}.1", name)), buffer)?;
    }

    println!("Man pages written to {}", out_dir.display());
    Ok(())
}
