//! Integration tests for the pipeline.
//!
//! These tests run a full training pass on a small CSV catalog and verify
//! that the written artifacts load back consistently.

use data_loader::QualityTier;
use model_store::{MatrixFormat, ModelArtifactSet, StoreConfig};
use pipeline::{Trainer, TrainingConfig, VectorizerConfig};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const HEADER: &str = "id,title,release_date,vote_average,vote_count,popularity,overview,tagline,genres,keywords,production_companies,production_countries,status,poster_path,imdb_id";

fn rows() -> Vec<String> {
    let movies = [
        (1, "Alien", "1979-05-25", 8.1, 14000, "A crew aboard a space freighter meets a deadly alien creature", "Horror, Science Fiction", "space, alien, monster", "Brandywine Productions"),
        (2, "Aliens", "1986-07-18", 7.9, 9800, "Marines return to the alien planet to fight the creature hive", "Action, Science Fiction", "space, alien, marines", "Brandywine Productions"),
        (3, "Event Horizon", "1997-08-15", 6.7, 3000, "A rescue crew finds a lost space ship that went to hell", "Horror, Science Fiction", "space, ship, hell", "Paramount"),
        (4, "Sunshine", "2007-04-05", 7.2, 4300, "A space crew must reignite the dying sun to save the earth", "Science Fiction, Thriller", "space, sun, crew", "DNA Films"),
        (5, "Notting Hill", "1999-05-13", 7.0, 5000, "A london bookshop owner falls in love with a famous actress", "Romance, Comedy", "london, bookshop, love", "Working Title Films"),
        (6, "Love Actually", "2003-09-07", 7.1, 6500, "Interwoven love stories in london during christmas", "Romance, Comedy", "london, christmas, love", "Working Title Films"),
        (7, "About Time", "2013-08-16", 7.9, 7200, "A young man can travel in time and uses it to find love in london", "Romance, Drama", "time travel, love, london", "Working Title Films"),
        (8, "Heat", "1995-12-15", 7.9, 7000, "A detective hunts a crew of professional bank robbers in los angeles", "Crime, Thriller", "heist, robbery, detective", "Regency Enterprises"),
        (9, "Ronin", "1998-09-25", 6.9, 2000, "Mercenaries hunt a mysterious case across france in car chases", "Crime, Action", "heist, mercenary, car chase", "United Artists"),
        (10, "The Town", "2010-09-15", 7.2, 4500, "A bank robber falls for the manager of the bank his crew robbed", "Crime, Drama", "heist, robbery, boston", "Legendary Pictures"),
        (11, "Obscure Short", "2010-01-01", 6.0, 3, "A short film nobody has voted on with plenty of words anyway", "Drama", "short", "Nobody"),
        (12, "Coming Soon", "2030-01-01", 0.0, 100, "A movie that has not been released yet but has many votes", "Drama", "future", "Studio"),
    ];
    movies
        .iter()
        .map(|(id, title, date, avg, votes, overview, genres, keywords, company)| {
            let status = if *id == 12 { "Planned" } else { "Released" };
            format!(
                "{},{},{},{},{},10.0,{},,\"{}\",\"{}\",\"{}\",United States of America,{},/p{}.jpg,tt{:07}",
                id, title, date, avg, votes, overview, genres, keywords, company, status, id, id
            )
        })
        .collect()
}

fn write_catalog(dir: &Path, extra: &[String]) -> PathBuf {
    let mut content = vec![HEADER.to_string()];
    content.extend(rows());
    content.extend(extra.iter().cloned());
    let path = dir.join("movies.csv");
    std::fs::write(&path, content.join("\n")).unwrap();
    path
}

fn config() -> TrainingConfig {
    TrainingConfig {
        quality_tier: QualityTier::Low,
        vectorizer: VectorizerConfig {
            min_df: 2,
            ..VectorizerConfig::default()
        },
        ..TrainingConfig::default()
    }
}

fn train(config: TrainingConfig, extra: &[String]) -> (TempDir, TempDir, ModelArtifactSet) {
    let data_dir = tempfile::tempdir().unwrap();
    let model_dir = tempfile::tempdir().unwrap();
    let csv = write_catalog(data_dir.path(), extra);
    Trainer::new(config).train(&csv, model_dir.path()).unwrap();
    let loaded = ModelArtifactSet::load(model_dir.path()).unwrap();
    (data_dir, model_dir, loaded)
}

#[test]
fn test_end_to_end_training() {
    let (_data, _model, artifacts) = train(config(), &[]);

    // The low-vote and unreleased rows are filtered out
    assert_eq!(artifacts.len(), 10);
    assert!(artifacts.index_of("Obscure Short").is_none());
    assert!(artifacts.index_of("Coming Soon").is_none());
    assert_eq!(artifacts.config().n_movies, 10);
    assert_eq!(artifacts.config().quality_tier, QualityTier::Low);
    // 10 movies is far below the reduction floor
    assert_eq!(artifacts.config().n_components, None);

    // Title index agrees with the metadata table
    for (idx, movie) in artifacts.metadata().iter().enumerate() {
        assert_eq!(artifacts.index_of(&movie.title), Some(idx));
    }

    // Metadata carries normalized genres and the primary company
    let heat = artifacts.movie(artifacts.index_of("Heat").unwrap()).unwrap();
    assert_eq!(heat.genres, vec!["crime", "thriller"]);
    assert_eq!(heat.primary_company.as_deref(), Some("Regency Enterprises"));
    assert_eq!(heat.imdb_id.as_deref(), Some("tt0000008"));
}

#[test]
fn test_neighbours_share_content() {
    let (_data, _model, artifacts) = train(config(), &[]);
    let sim = artifacts.similarity();
    let alien = artifacts.index_of("Alien").unwrap();
    let aliens = artifacts.index_of("Aliens").unwrap();
    let notting = artifacts.index_of("Notting Hill").unwrap();
    let love = artifacts.index_of("Love Actually").unwrap();

    assert!(sim.get(alien, aliens) > sim.get(alien, notting));
    assert!(sim.get(notting, love) > sim.get(notting, aliens));
    for i in 0..artifacts.len() {
        for j in 0..artifacts.len() {
            assert_eq!(sim.get(i, j), sim.get(j, i));
            assert!((-1.0..=1.0).contains(&sim.get(i, j)));
        }
    }
}

#[test]
fn test_duplicate_titles_keep_best() {
    // A weaker second "Heat" must not replace the original
    let duplicate = "99,Heat,1986-01-01,5.0,40,1.0,A different movie entirely about a heat wave in a small town,,\"Drama\",\"summer\",\"Other\",,Released,,".to_string();
    let (_data, _model, artifacts) = train(config(), &[duplicate]);
    assert_eq!(artifacts.len(), 10);
    let heat = artifacts.movie(artifacts.index_of("Heat").unwrap()).unwrap();
    assert_eq!(heat.id, Some(8));
}

#[test]
fn test_training_is_deterministic() {
    let (_d1, _m1, first) = train(config(), &[]);
    let (_d2, _m2, second) = train(config(), &[]);
    assert_eq!(first.similarity(), second.similarity());
    assert_eq!(first.metadata(), second.metadata());
}

#[test]
fn test_sparse_storage_and_cap() {
    let config = TrainingConfig {
        max_movies: Some(5),
        store: StoreConfig { sparse_threshold: 1 },
        ..config()
    };
    let data_dir = tempfile::tempdir().unwrap();
    let model_dir = tempfile::tempdir().unwrap();
    let csv = write_catalog(data_dir.path(), &[]);

    let (output, saved) = Trainer::new(config).train(&csv, model_dir.path()).unwrap();
    assert_eq!(saved.matrix_format, MatrixFormat::Sparse);
    assert_eq!(output.artifacts.len(), 5);
    assert_eq!(output.report.capped, 5);

    let loaded = ModelArtifactSet::load(model_dir.path()).unwrap();
    assert_eq!(loaded.similarity(), output.artifacts.similarity());
}

#[test]
fn test_missing_dataset_is_error() {
    let model_dir = tempfile::tempdir().unwrap();
    let result = Trainer::new(config()).train(Path::new("/nonexistent/movies.csv"), model_dir.path());
    assert!(result.is_err());
    assert!(!ModelArtifactSet::exists(model_dir.path()));
}
