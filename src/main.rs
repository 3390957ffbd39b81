use clap::Parser;
use log::error;

use segprep::config::{Cli, Command, ToolsConfig};
use segprep::{
    remap_dataset, resize_images, run_augmentation, split_dataset, ClassRemap, SplitOptions,
};

fn main() {
    // Initialize the logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        error!("{}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> segprep::Result<()> {
    match cli.command {
        Command::Augment {
            dataset_root,
            dataset_name,
            config,
        } => {
            let tools = ToolsConfig::load(&config)?;
            run_augmentation(&dataset_root, &dataset_name, &tools)?;
        }
        Command::Remap {
            labels_dir,
            map,
            no_backup,
        } => {
            let map = ClassRemap::parse(&map)?;
            remap_dataset(&labels_dir, &map, !no_backup)?;
        }
        Command::Resize {
            input_dir,
            output_dir,
            size,
        } => {
            resize_images(&input_dir, &output_dir, size)?;
        }
        Command::Split {
            dataset_root,
            dataset_name,
            output_dir,
            val_size,
            test_size,
            seed,
        } => {
            split_dataset(
                &dataset_root,
                &dataset_name,
                &output_dir,
                &SplitOptions {
                    val_size,
                    test_size,
                    seed,
                },
            )?;
        }
    }
    Ok(())
}
