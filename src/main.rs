//! Genre classifier CLI
//!
//! Train and evaluate a feed-forward genre classifier on precomputed audio
//! embeddings and draw diagnostic plots.

#![recursion_limit = "256"]

use clap::{Parser, Subcommand};
use genre::{Config, Result};

#[derive(Parser)]
#[command(name = "genre")]
#[command(about = "Music genre classification on audio embeddings", long_about = None)]
struct Cli {
    /// Config file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new project with default config
    Init {
        /// Also write a synthetic embedding set to the train/test directories
        #[arg(long)]
        demo: bool,
    },
    /// Train the classifier and plot loss curves and confusion matrix
    Train {
        /// Override number of epochs
        #[arg(long)]
        epochs: Option<usize>,
        /// Override learning rate
        #[arg(long)]
        lr: Option<f64>,
        /// Override batch size (0 for full batch)
        #[arg(long)]
        batch_size: Option<usize>,
        /// Train on the GPU (wgpu)
        #[arg(long)]
        gpu: bool,
    },
    /// Evaluate the saved model on the test embeddings
    Evaluate {
        /// Run on the GPU (wgpu)
        #[arg(long)]
        gpu: bool,
    },
    /// Plot t-SNE projections of the train and test embeddings
    Tsne {
        /// Also write one plot per genre from a joint projection
        #[arg(long)]
        per_genre: bool,
    },
    /// Classify a single embedding file
    Classify {
        /// Path to a .npy embedding
        file: String,
        /// Number of genres to show
        #[arg(long, default_value = "3")]
        top: usize,
        /// Output format
        #[arg(long, default_value = "table")]
        format: OutputFormat,
    },
}

#[derive(Clone, Debug)]
enum OutputFormat {
    Table,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown format: {}. Use table or json.", s)),
        }
    }
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // Load or create config
    let config = if std::path::Path::new(&cli.config).exists() {
        match Config::load(&cli.config) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Error loading config: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        Config::default()
    };

    let result = match cli.command {
        Commands::Init { demo } => commands::init(&cli.config, &config, demo),
        Commands::Train {
            epochs,
            lr,
            batch_size,
            gpu,
        } => {
            let mut config = config;
            if let Some(e) = epochs {
                config.training.epochs = e;
            }
            if let Some(lr) = lr {
                config.training.learning_rate = lr;
            }
            if let Some(b) = batch_size {
                config.training.batch_size = b;
            }
            if gpu || config.training.use_gpu {
                commands::train::<burn::backend::Wgpu<f32, i32>>(&config)
            } else {
                commands::train::<burn::backend::NdArray<f32>>(&config)
            }
        }
        Commands::Evaluate { gpu } => {
            if gpu || config.training.use_gpu {
                commands::evaluate::<burn::backend::Wgpu<f32, i32>>(&config)
            } else {
                commands::evaluate::<burn::backend::NdArray<f32>>(&config)
            }
        }
        Commands::Tsne { per_genre } => commands::tsne(&config, per_genre),
        Commands::Classify { file, top, format } => commands::classify(&config, &file, top, format),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

mod commands {
    use super::*;
    use std::path::Path;

    use burn::backend::Autodiff;
    use burn::module::AutodiffModule;
    use burn::tensor::backend::Backend;
    use genre::analysis::{self, Tsne};
    use genre::data::synthetic::write_clustered_embeddings;
    use genre::data::EmbeddingDataset;
    use genre::model::{ClassifierConfig, GenreClassifier};
    use genre::predict::GenrePredictor;
    use genre::training::{self, ClassifierTrainer};
    use genre::{Genre, GenreError};

    /// File the training history is written to, next to the plots
    const HISTORY_FILE: &str = "train_results.json";

    pub fn init(config_path: &str, config: &Config, demo: bool) -> Result<()> {
        config.save(config_path)?;
        println!("Created config at {}", config_path);

        for dir in [
            &config.data.train_embeddings,
            &config.data.test_embeddings,
            &config.data.plots_dir,
        ] {
            std::fs::create_dir_all(dir)?;
        }
        if let Some(parent) = Path::new(&config.data.model_path).parent() {
            std::fs::create_dir_all(parent)?;
        }
        println!("Created embedding, plot and model directories");

        if demo {
            let dim = config.model.embedding_dim;
            let seed = config.training.seed;
            let n_train = write_clustered_embeddings(
                Path::new(&config.data.train_embeddings),
                dim,
                40,
                0.5,
                seed,
                seed + 1,
            )?;
            let n_test = write_clustered_embeddings(
                Path::new(&config.data.test_embeddings),
                dim,
                10,
                0.5,
                seed,
                seed + 2,
            )?;
            println!("Wrote {} train and {} test demo embeddings", n_train, n_test);
        }

        println!("\nNext steps:");
        println!("  1. Put embedding .npy files named after their genre in {}", config.data.train_embeddings);
        println!("     and {}", config.data.test_embeddings);
        println!("  2. Run 'genre train' to train the classifier");
        println!("  3. Run 'genre tsne' to plot the embedding space");

        Ok(())
    }

    fn load_datasets(config: &Config) -> Result<(EmbeddingDataset, EmbeddingDataset)> {
        let dim = config.model.embedding_dim;
        let train = EmbeddingDataset::from_dir(&config.data.train_embeddings, dim)?;
        let test = EmbeddingDataset::from_dir(&config.data.test_embeddings, dim)?;
        Ok((train, test))
    }

    pub fn train<B: Backend>(config: &Config) -> Result<()> {
        let device = B::Device::default();
        let (train_dataset, test_dataset) = load_datasets(config)?;
        println!(
            "Training on {} embeddings, validating on {}",
            train_dataset.len(),
            test_dataset.len()
        );

        let classifier_config = ClassifierConfig::from(&config.model);
        let model = GenreClassifier::<Autodiff<B>>::new(&device, &classifier_config);
        let trainer = ClassifierTrainer::new(
            model,
            config.training.learning_rate,
            config.training.seed,
            device.clone(),
        );

        let (model, history) = trainer.train(
            train_dataset,
            test_dataset.clone(),
            config.training.epochs,
            config.training.batch_size,
            config.training.early_stopping_patience,
        )?;

        let best = history.best_epoch;
        println!(
            "Best epoch {}: val_loss {:.4}, val_acc {:.2}%",
            best + 1,
            history.val_losses[best],
            history.val_accuracies[best] * 100.0
        );

        model.save(Path::new(&config.data.model_path))?;
        println!("Saved model to {}", config.data.model_path);

        let plots_dir = Path::new(&config.data.plots_dir);
        std::fs::create_dir_all(plots_dir)?;
        history.save(&plots_dir.join(HISTORY_FILE))?;
        analysis::plot_training_history(&history, plots_dir)?;

        let cm = training::evaluate(&model.valid(), &test_dataset, &device)?;
        println!("\n{}", cm);
        analysis::plot_confusion_matrix(&cm, plots_dir)?;

        Ok(())
    }

    pub fn evaluate<B: Backend>(config: &Config) -> Result<()> {
        let device = B::Device::default();
        let model_path = Path::new(&config.data.model_path);
        if !model_path.with_extension("mpk").exists() {
            return Err(GenreError::NoModel);
        }

        let classifier_config = ClassifierConfig::from(&config.model);
        let model = GenreClassifier::<B>::load(&device, model_path, &classifier_config)?;
        let test_dataset =
            EmbeddingDataset::from_dir(&config.data.test_embeddings, config.model.embedding_dim)?;

        let cm = training::evaluate(&model, &test_dataset, &device)?;
        println!("{}", cm);

        let precision = cm.per_class_precision();
        let recall = cm.per_class_recall();
        println!("\n{:>10} {:>10} {:>10}", "genre", "precision", "recall");
        let pct = |v: Option<f64>| v.map_or("-".to_string(), |v| format!("{:.1}%", v * 100.0));
        for g in Genre::ALL {
            println!(
                "{:>10} {:>10} {:>10}",
                g.name(),
                pct(precision[g.index()]),
                pct(recall[g.index()])
            );
        }

        analysis::plot_confusion_matrix(&cm, Path::new(&config.data.plots_dir))?;
        Ok(())
    }

    pub fn tsne(config: &Config, per_genre: bool) -> Result<()> {
        let (train_dataset, test_dataset) = load_datasets(config)?;
        let tsne = Tsne::from(&config.tsne);

        let written = analysis::tsne_report(
            &tsne,
            &train_dataset,
            &test_dataset,
            Path::new(&config.data.plots_dir),
            per_genre,
        )?;
        println!("Wrote {} t-SNE plots to {}", written.len(), config.data.plots_dir);
        Ok(())
    }

    pub fn classify(config: &Config, file: &str, top: usize, format: OutputFormat) -> Result<()> {
        use burn::backend::NdArray;

        let device = Default::default();
        let predictor = GenrePredictor::<NdArray<f32>>::load(
            Path::new(&config.data.model_path),
            ClassifierConfig::from(&config.model),
            device,
        )?;

        let predictions = predictor.predict_file(Path::new(file))?;
        let shown = &predictions[..top.clamp(1, predictions.len())];

        match format {
            OutputFormat::Table => {
                println!("{}", file);
                println!("───────────────────────────────");
                for p in shown {
                    println!("  {:<10} {:>6.2}%", p.genre.name(), p.probability * 100.0);
                }
            }
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(shown)?);
            }
        }

        Ok(())
    }
}
