use crate::cli::ReplicateArgs;
use crate::error::Result;
use moltopo::core::io::top::TopFile;
use moltopo::core::io::traits::MolecularFile;
use moltopo::core::settings::Settings;

pub fn run(args: ReplicateArgs, settings: &Settings) -> Result<()> {
    let options = settings.top_options();
    let mut top = TopFile::read_from_path(&args.input, &options)?;
    let copies = top.replicate()?;
    TopFile::write_to_path(&top, &options, &args.output)?;

    println!(
        "Wrote {} copies ({} atoms) to {}",
        copies,
        top.topology.len(),
        args.output.display()
    );
    Ok(())
}
