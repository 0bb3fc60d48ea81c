//
//! CLI supporting `split`, `inspect`, `synth`, and `load`.
//!
//! Examples:
//! ```bash
//! fsdl-cli split    labels.tsv -o splits/ --fraction 0.8 --seed 42 --validation 1000
//! fsdl-cli inspect  labels.tsv
//! fsdl-cli synth    corpus/ --count 10000 --size 4096 --classes 10 --seed 7
//! fsdl-cli load     splits/train.tsv --root corpus/ -b 64 -w 8 --shuffle --epochs 2
//! ```

use anyhow::{Context, Result, bail};
use clap::{ArgAction, Parser, Subcommand};
use futures_util::StreamExt;
use rand::{Rng, RngCore, SeedableRng};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use fsdlio::constants::{AUTO_WORKER_COUNT, DEFAULT_HELD_OUT_FRACTION};
use fsdlio::{
    DataLoader, FileManifestDataset, FixedLength, LabelRecord, LabelTable, LoaderOptions,
    PartitionPlanner, RawU8Decoder, TransformPipeline,
};

#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    #[arg(short = 'v',
        long,
        action = ArgAction::Count,
        help = "Increase log verbosity: -v = Info, -vv = Debug",
    )]
    verbose: u8,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Partition a manifest into train / validation / test manifests.
    Split {
        /// Input manifest (tab-separated, `path` column first).
        manifest: PathBuf,

        /// Directory the subset manifests are written into.
        #[arg(short, long, default_value = ".")]
        out_dir: PathBuf,

        /// Fraction of rows kept on the training side.
        #[arg(short, long, default_value_t = DEFAULT_HELD_OUT_FRACTION)]
        fraction: f64,

        /// Partitioning seed.
        #[arg(short, long, default_value_t = 0)]
        seed: u64,

        /// Rows carved from the kept subset for validation.
        #[arg(long, default_value_t = 0)]
        validation: usize,
    },

    /// Print a manifest's row count, label columns and class counts.
    Inspect {
        manifest: PathBuf,

        /// Also print the first N rows.
        #[arg(long, default_value_t = 0)]
        head: usize,
    },

    /// Generate a synthetic corpus (random-byte items plus a manifest).
    Synth {
        /// Output directory; items land in `<dir>/items/`, the manifest at
        /// `<dir>/labels.tsv`.
        dir: PathBuf,

        /// Number of items to generate.
        #[arg(short, long, default_value_t = 1000)]
        count: usize,

        /// Bytes per item.
        #[arg(short, long, default_value_t = 4096)]
        size: usize,

        /// Number of label classes.
        #[arg(long, default_value_t = 10)]
        classes: i64,

        /// Generation seed.
        #[arg(long, default_value_t = 0)]
        seed: u64,
    },

    /// Stream a manifest through the pool loader and report throughput.
    Load {
        manifest: PathBuf,

        /// Root directory the manifest paths resolve against.
        #[arg(short, long)]
        root: PathBuf,

        #[arg(short, long, default_value_t = 64)]
        batch_size: usize,

        /// Worker tasks; 0 runs synchronously.
        #[arg(short = 'w', long, default_value_t = *AUTO_WORKER_COUNT)]
        workers: usize,

        /// In-flight batch cap.
        #[arg(short, long, default_value_t = 4)]
        prefetch: usize,

        /// Visit rows in seeded shuffled order.
        #[arg(long)]
        shuffle: bool,

        #[arg(long, default_value_t = 0)]
        seed: u64,

        /// Tensor length every item is truncated/padded to.
        #[arg(long, default_value_t = 4096)]
        sample_len: usize,

        #[arg(long, default_value_t = 1)]
        epochs: u64,

        /// Drop the final short batch of each epoch.
        #[arg(long)]
        drop_last: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Loads any variables from .env file that are not already set
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Initialise logging once, based on how many `-v` flags were given:
    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter)).init();

    match cli.cmd {
        Command::Split { manifest, out_dir, fraction, seed, validation } => {
            cmd_split(&manifest, &out_dir, fraction, seed, validation)
        }
        Command::Inspect { manifest, head } => cmd_inspect(&manifest, head),
        Command::Synth { dir, count, size, classes, seed } => {
            cmd_synth(&dir, count, size, classes, seed)
        }
        Command::Load {
            manifest,
            root,
            batch_size,
            workers,
            prefetch,
            shuffle,
            seed,
            sample_len,
            epochs,
            drop_last,
        } => {
            cmd_load(
                &manifest, &root, batch_size, workers, prefetch, shuffle, seed, sample_len,
                epochs, drop_last,
            )
            .await
        }
    }
}

fn cmd_split(
    manifest: &PathBuf,
    out_dir: &PathBuf,
    fraction: f64,
    seed: u64,
    validation: usize,
) -> Result<()> {
    let table = LabelTable::read_tsv(manifest)
        .with_context(|| format!("reading manifest {}", manifest.display()))?;

    let subsets = PartitionPlanner::new(fraction, seed)?
        .with_validation_size(validation)
        .split_tables(&table)?;

    fs::create_dir_all(out_dir)?;
    subsets.train.write_tsv(out_dir.join("train.tsv"))?;
    subsets.test.write_tsv(out_dir.join("test.tsv"))?;
    println!("train:      {:>8} rows", subsets.train.len());
    if let Some(val) = &subsets.validation {
        val.write_tsv(out_dir.join("validation.tsv"))?;
        println!("validation: {:>8} rows", val.len());
    }
    println!("test:       {:>8} rows", subsets.test.len());
    Ok(())
}

fn cmd_inspect(manifest: &PathBuf, head: usize) -> Result<()> {
    let table = LabelTable::read_tsv(manifest)?;
    println!("rows: {}", table.len());
    for (col, name) in table.label_columns().iter().enumerate() {
        println!("label '{}': {} classes", name, table.num_classes(col));
    }
    for rec in table.records().iter().take(head) {
        println!("{}\t{:?}", rec.path, rec.labels);
    }
    Ok(())
}

fn cmd_synth(dir: &PathBuf, count: usize, size: usize, classes: i64, seed: u64) -> Result<()> {
    if classes <= 0 {
        bail!("--classes must be positive");
    }
    let items = dir.join("items");
    fs::create_dir_all(&items)?;

    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
    let mut buf = vec![0u8; size];
    let mut records = Vec::with_capacity(count);
    for i in 0..count {
        rng.fill_bytes(&mut buf);
        let name = format!("items/item_{i:06}.bin");
        fs::write(dir.join(&name), &buf)?;
        records.push(LabelRecord {
            path: name,
            labels: vec![rng.random_range(0..classes)],
        });
    }

    let table = LabelTable::new(vec!["class".to_string()], records)?;
    let manifest = dir.join("labels.tsv");
    table.write_tsv(&manifest)?;
    println!(
        "wrote {} items of {} bytes and manifest {}",
        count,
        size,
        manifest.display()
    );
    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn cmd_load(
    manifest: &PathBuf,
    root: &PathBuf,
    batch_size: usize,
    workers: usize,
    prefetch: usize,
    shuffle: bool,
    seed: u64,
    sample_len: usize,
    epochs: u64,
    drop_last: bool,
) -> Result<()> {
    let table = Arc::new(LabelTable::read_tsv(manifest)?);
    let pipeline = TransformPipeline::new(Arc::new(RawU8Decoder))
        .then(Arc::new(FixedLength { len: sample_len }));
    let dataset = FileManifestDataset::new(table, root.clone(), pipeline);

    let opts = LoaderOptions::default()
        .with_batch_size(batch_size)
        .drop_last(drop_last)
        .shuffle(shuffle, seed)
        .num_workers(workers)
        .prefetch(prefetch);
    let loader = DataLoader::new(dataset, opts)?;

    let start = Instant::now();
    let mut batches = 0u64;
    let mut items = 0u64;
    let mut failures = 0u64;
    for epoch in 0..epochs {
        let mut stream = loader.epoch_stream(epoch);
        while let Some(result) = stream.next().await {
            match result {
                Ok(batch) => {
                    batches += 1;
                    items += batch.len() as u64;
                }
                Err(e) => {
                    eprintln!("{e}");
                    failures += 1;
                }
            }
        }
    }
    let elapsed = start.elapsed();

    println!(
        "{} epochs, {} batches, {} items ({} failed batches) in {}",
        epochs,
        batches,
        items,
        failures,
        humantime::format_duration(elapsed)
    );
    if elapsed.as_secs_f64() > 0.0 {
        println!("{:.0} items/s", items as f64 / elapsed.as_secs_f64());
    }
    Ok(())
}
