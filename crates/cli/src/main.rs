use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use data_loader::QualityTier;
use pipeline::{Trainer, TrainingConfig};
use rand::Rng;
use serde::Serialize;
use server::{
    EngineConfig, ModelHandle, MovieDetails, RecommendFilters, RecommendOutcome,
    RecommendationResult, Recommender, TopRatedMovie,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tracing::info;

/// ReelMatch - Content-based Movie Recommendation Engine
#[derive(Parser)]
#[command(name = "reel-match")]
#[command(about = "Content-based movie recommendations from TF-IDF similarity", long_about = None)]
struct Cli {
    /// Dataset CSV, or a directory holding TMDB_movie_dataset_v11.csv
    #[arg(short, long, env = "REEL_DATA", default_value = "data")]
    data_dir: PathBuf,

    /// Directory holding the trained model artifacts
    #[arg(short, long, env = "REEL_MODEL_DIR", default_value = "models")]
    model_dir: PathBuf,

    /// Print results as JSON instead of formatted text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Train a model from the dataset and save it to the model directory
    Train {
        #[command(flatten)]
        overrides: TrainOverrides,

        /// JSON training config; flags given on the command line override it
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Recommend movies similar to a title
    Recommend {
        /// Movie title (exact or approximate)
        title: String,

        /// Number of recommendations to return
        #[arg(short = 'n', long, default_value = "10")]
        limit: usize,

        #[arg(long)]
        min_year: Option<i32>,

        #[arg(long)]
        max_year: Option<i32>,

        /// Minimum vote average (0-10)
        #[arg(long)]
        min_rating: Option<f32>,

        /// Comma-separated genres; any overlap qualifies
        #[arg(long, value_delimiter = ',')]
        genres: Vec<String>,

        /// Skip movies from the same production company
        #[arg(long)]
        exclude_same_company: bool,

        /// Show similarity scores
        #[arg(long)]
        scores: bool,
    },

    /// Recommend similar but mutually diverse movies (MMR)
    Diverse {
        title: String,

        #[arg(short = 'n', long, default_value = "10")]
        limit: usize,

        /// Diversity weight in [0, 1]; higher favours variety over relevance
        #[arg(long)]
        diversity: Option<f32>,
    },

    /// Search titles by case-insensitive substring
    Search {
        query: String,

        #[arg(short = 'n', long, default_value = "20")]
        limit: usize,

        #[arg(long)]
        min_rating: Option<f32>,
    },

    /// Show details of one movie
    Details { title: String },

    /// List the best-rated movies
    TopRated {
        #[arg(short = 'n', long, default_value = "10")]
        limit: usize,

        #[arg(long, default_value = "1000")]
        min_votes: u32,

        #[arg(long, value_delimiter = ',')]
        genres: Vec<String>,
    },

    /// Load the model and report whether it can serve requests
    Health,

    /// Run benchmark to test recommendation latency
    Benchmark {
        /// Number of requests to make
        #[arg(long, default_value = "100")]
        requests: usize,

        /// Number of concurrent requests
        #[arg(long, default_value = "10")]
        concurrent: usize,
    },
}

/// Movie cap used by `train` when no config file is given
const DEFAULT_MAX_MOVIES: usize = 50_000;

/// Training settings given on the command line; unset flags keep the base config.
#[derive(Args, Debug, Default, Clone, PartialEq)]
struct TrainOverrides {
    /// Vote-count tier: low (5+), medium (50+) or high (500+)
    #[arg(long)]
    quality: Option<QualityTier>,

    /// Keep only the best N movies by quality score
    #[arg(long)]
    max_movies: Option<usize>,

    /// Train on every movie that passes the quality tier
    #[arg(long, conflicts_with = "max_movies")]
    all_movies: bool,

    /// Run the truncated SVD on large corpora
    #[arg(long, conflicts_with = "no_reduction")]
    reduction: bool,

    /// Skip the truncated SVD even on large corpora
    #[arg(long)]
    no_reduction: bool,

    /// Target rank of the truncated SVD
    #[arg(long)]
    n_components: Option<usize>,
}

impl TrainOverrides {
    fn apply(&self, training: &mut TrainingConfig) {
        if let Some(quality) = self.quality {
            training.quality_tier = quality;
        }
        if let Some(max_movies) = self.max_movies {
            training.max_movies = Some(max_movies);
        }
        if self.all_movies {
            training.max_movies = None;
        }
        if self.reduction {
            training.use_reduction = true;
        }
        if self.no_reduction {
            training.use_reduction = false;
        }
        if let Some(n_components) = self.n_components {
            training.reducer.n_components = n_components;
        }
    }
}

/// Config file contents, or the CLI defaults (50 000 movie cap) without one
fn base_training_config(path: Option<&Path>) -> Result<TrainingConfig> {
    match path {
        Some(path) => read_training_config(path),
        None => Ok(TrainingConfig {
            max_movies: Some(DEFAULT_MAX_MOVIES),
            ..TrainingConfig::default()
        }),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    if let Commands::Train { overrides, config } = &cli.command {
        let mut training = base_training_config(config.as_deref())?;
        overrides.apply(&mut training);
        return handle_train(&cli.data_dir, &cli.model_dir, training, cli.json).await;
    }

    // Every other command serves from the model, training in memory if there is none yet
    let handle = ModelHandle::new(&cli.model_dir, EngineConfig::default())
        .with_fallback_data(&cli.data_dir, TrainingConfig::default());

    if let Commands::Health = cli.command {
        let health = handle.health_check().await;
        if cli.json {
            print_json(&health)?;
        } else if health.is_healthy() {
            println!(
                "{} healthy: {} movies loaded",
                "✓".green(),
                health.movies_loaded
            );
        } else {
            println!(
                "{} unhealthy: {}",
                "✗".red(),
                health.error.as_deref().unwrap_or("model not loaded")
            );
        }
        return Ok(());
    }

    let start = Instant::now();
    let engine = handle
        .recommender()
        .await
        .context("Failed to load the recommendation model")?;
    if !cli.json {
        println!(
            "{} Loaded {} movies in {:?}",
            "✓".green(),
            engine.artifacts().len(),
            start.elapsed()
        );
    }

    // Dispatch to appropriate command handler
    match cli.command {
        Commands::Recommend {
            title,
            limit,
            min_year,
            max_year,
            min_rating,
            genres,
            exclude_same_company,
            scores,
        } => {
            let filters = RecommendFilters {
                min_year,
                max_year,
                min_rating,
                genres,
                exclude_same_company,
            };
            let outcome = engine.recommend(&title, limit, &filters);
            print_outcome(&outcome, scores, cli.json)?;
        }
        Commands::Diverse {
            title,
            limit,
            diversity,
        } => {
            let diversity = diversity.unwrap_or(engine.config().default_diversity);
            let outcome = engine.diverse_recommendations(&title, limit, diversity);
            print_outcome(&outcome, true, cli.json)?;
        }
        Commands::Search {
            query,
            limit,
            min_rating,
        } => {
            let matches = engine.search_titles(&query, limit, min_rating);
            if cli.json {
                print_json(&matches)?;
            } else {
                println!("{}", format!("Search results for '{}':", query).bold().blue());
                for title in &matches {
                    println!("{}{}", "• ".green(), title);
                }
                if matches.is_empty() {
                    println!("No titles contain '{}'", query);
                }
            }
        }
        Commands::Details { title } => match engine.movie_details(&title) {
            Some(details) if cli.json => print_json(&details)?,
            Some(details) => print_details(&details),
            None => bail!("Movie '{}' not found", title),
        },
        Commands::TopRated {
            limit,
            min_votes,
            genres,
        } => {
            let top = engine.top_rated(limit, min_votes, &genres);
            if cli.json {
                print_json(&top)?;
            } else {
                print_top_rated(&top);
            }
        }
        Commands::Benchmark {
            requests,
            concurrent,
        } => handle_benchmark(engine, requests, concurrent).await?,
        Commands::Train { .. } | Commands::Health => {}
    }

    Ok(())
}

fn read_training_config(path: &Path) -> Result<TrainingConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read training config {:?}", path))?;
    serde_json::from_str(&text).with_context(|| format!("Invalid training config {:?}", path))
}

/// Handle the 'train' command
async fn handle_train(
    data_dir: &Path,
    model_dir: &Path,
    training: TrainingConfig,
    json: bool,
) -> Result<()> {
    if !json {
        println!(
            "Training on {} (quality tier: {})...",
            data_dir.display(),
            training.quality_tier
        );
    }
    let start = Instant::now();
    let data_dir = data_dir.to_path_buf();
    let model_dir = model_dir.to_path_buf();
    let out_dir = model_dir.clone();
    let (output, saved) =
        tokio::task::spawn_blocking(move || Trainer::new(training).train(&data_dir, &out_dir))
            .await
            .context("Training task panicked")??;

    let report = &output.report;
    if json {
        #[derive(Serialize)]
        struct TrainSummary<'a> {
            movies: usize,
            vocabulary_size: usize,
            sparsity: f64,
            n_components: Option<usize>,
            explained_variance: Option<f64>,
            files: &'a [(String, u64)],
            total_bytes: u64,
            seconds: f64,
        }
        return print_json(&TrainSummary {
            movies: output.artifacts.len(),
            vocabulary_size: report.vocabulary_size,
            sparsity: report.sparsity,
            n_components: report.n_components,
            explained_variance: report.explained_variance,
            files: &saved.files,
            total_bytes: saved.total_bytes(),
            seconds: start.elapsed().as_secs_f64(),
        });
    }

    println!("{} Trained in {:?}", "✓".green(), start.elapsed());
    println!("{}Movies: {}", "• ".green(), output.artifacts.len());
    println!(
        "{}Rows: {} read, {} below vote threshold, {} unreleased, {} duplicates",
        "• ".green(),
        report.load.rows_read,
        report.build.below_vote_threshold,
        report.build.unreleased,
        report.build.duplicate_titles
    );
    println!("{}Vocabulary: {} terms", "• ".green(), report.vocabulary_size);
    println!("{}Sparsity: {:.2}%", "• ".green(), report.sparsity);
    match (report.n_components, report.explained_variance) {
        (Some(k), Some(ratio)) => println!(
            "{}SVD: {} components, explained variance {:.3}",
            "• ".green(),
            k,
            ratio
        ),
        _ => println!("{}SVD: skipped", "• ".green()),
    }
    println!("{}", format!("Saved to {}:", model_dir.display()).bold().blue());
    for (name, size) in &saved.files {
        println!("  - {} ({:.1} MB)", name, *size as f64 / 1024.0 / 1024.0);
    }
    println!(
        "  Total: {:.1} MB",
        saved.total_bytes() as f64 / 1024.0 / 1024.0
    );
    Ok(())
}

/// Handle the 'benchmark' command
async fn handle_benchmark(engine: Arc<Recommender>, requests: usize, concurrent: usize) -> Result<()> {
    let n_movies = engine.artifacts().len();
    if requests == 0 || n_movies == 0 {
        bail!("Nothing to benchmark");
    }

    // Random query titles drawn from the corpus
    let mut rng = rand::rng();
    let titles: Vec<String> = (0..requests)
        .filter_map(|_| {
            let idx = rng.random_range(0..n_movies);
            engine.artifacts().movie(idx).map(|m| m.title.clone())
        })
        .collect();

    info!(
        "Benchmarking {} requests, {} at a time, over {} movies",
        titles.len(),
        concurrent,
        n_movies
    );
    let permits = Arc::new(Semaphore::new(concurrent.max(1)));
    let wall_clock = Instant::now();
    let mut handles = vec![];
    for title in titles {
        let engine = engine.clone();
        let permits = permits.clone();
        handles.push(tokio::spawn(async move {
            let _permit = permits.acquire_owned().await?;
            let elapsed = tokio::task::spawn_blocking(move || {
                let start = Instant::now();
                engine.recommend(&title, 10, &RecommendFilters::default());
                start.elapsed()
            })
            .await?;
            Ok::<_, anyhow::Error>(elapsed)
        }));
    }

    let mut timings: Vec<Duration> = vec![];
    for handle in handles {
        timings.push(handle.await??);
    }
    let total_time = wall_clock.elapsed();
    timings.sort();
    let percentile = |p: f64| timings[((timings.len() as f64 * p) as usize).min(timings.len() - 1)];
    let latency_sum: Duration = timings.iter().sum();

    println!("{}", "Benchmark results:".bold().blue());
    println!("Total time: {:?}", total_time);
    println!("Average latency: {:?}", latency_sum / timings.len() as u32);
    println!("P50 latency: {:?}", percentile(0.50));
    println!("P95 latency: {:?}", percentile(0.95));
    println!("P99 latency: {:?}", percentile(0.99));
    println!(
        "Throughput: {:.2} requests/second",
        timings.len() as f64 / total_time.as_secs_f64()
    );
    Ok(())
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_outcome(outcome: &RecommendOutcome, show_scores: bool, json: bool) -> Result<()> {
    if json {
        return print_json(outcome);
    }
    match outcome {
        RecommendOutcome::Found(result) => print_recommendations(result, show_scores),
        RecommendOutcome::NotFound { query, suggestions } => {
            println!("{} Movie '{}' not found", "✗".red(), query);
            if suggestions.is_empty() {
                println!("Try a different spelling or search by partial title");
            } else {
                println!("{}", "Did you mean:".bold());
                for title in suggestions {
                    println!("   {}{}", "• ".yellow(), title);
                }
            }
        }
    }
    Ok(())
}

fn print_recommendations(result: &RecommendationResult, show_scores: bool) {
    if result.fuzzy_match {
        println!("Closest match: '{}'", result.query_movie);
    }
    let details = &result.query_details;
    println!(
        "{}",
        format!("Recommendations for: {}", result.query_movie).bold().blue()
    );
    println!(
        "   Production: {} | Rating: {} | Genres: {}",
        details.production,
        details.rating,
        genre_list(&details.genres)
    );
    if result.is_empty() {
        println!("No movies matched the filters");
        return;
    }

    for rec in &result.recommendations {
        let score = if show_scores {
            format!(" [Similarity: {:.3}]", rec.similarity_score)
        } else {
            String::new()
        };
        println!("{}. {}", format!("{:2}", rec.rank).green(), rec.title.bold());
        println!(
            "    {} ({} votes) | {}",
            rec.rating, rec.votes, rec.release_date
        );
        println!("    {} | {}{}", genre_list(&rec.genres), rec.production, score);
        println!("    {}", rec.imdb_link.dimmed());
    }
}

fn print_details(details: &MovieDetails) {
    println!("{}", details.title.bold().blue());
    println!("{}Released: {}", "• ".green(), details.release_date);
    println!("{}Production: {}", "• ".green(), details.production);
    println!("{}Genres: {}", "• ".green(), genre_list(&details.genres));
    println!("{}Rating: {} ({} votes)", "• ".cyan(), details.rating, details.votes);
    println!("{}Popularity: {}", "• ".cyan(), details.popularity);
    println!("{}IMDB: {}", "• ".cyan(), details.imdb_id);
    if let Some(poster) = &details.poster_url {
        println!("{}Poster: {}", "• ".cyan(), poster);
    }
    println!("{}", details.overview);
}

fn print_top_rated(movies: &[TopRatedMovie]) {
    println!("{}", "Top rated movies:".bold().blue());
    for (i, movie) in movies.iter().enumerate() {
        println!(
            "{}. {} - {} ({} votes) [{}]",
            (i + 1).to_string().green(),
            movie.title,
            movie.rating,
            movie.votes,
            genre_list(&movie.genres)
        );
    }
}

/// First three genres, comma-separated
fn genre_list(genres: &[String]) -> String {
    if genres.is_empty() {
        return "N/A".to_string();
    }
    genres.iter().take(3).cloned().collect::<Vec<_>>().join(", ")
}
