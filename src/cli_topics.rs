use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use lyrics_topics::pipeline::StoredRun;
use std::path::PathBuf;

fn parse_path(s: &str) -> Result<PathBuf> {
    let original_path = PathBuf::from(s);
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Output directory of a previous run.
    #[clap(value_parser = parse_path)]
    pub output_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Shows the four label families of every topic.
    Labels,

    /// Shows mean topic proportions per covariate level.
    Prevalence {
        /// Only this topic (1-based).
        #[clap(long)]
        topic: Option<usize>,
    },

    /// Shows the documents weighting each topic most.
    Representative,

    /// Shows the members of every cluster.
    Clusters,

    /// Shows the topic weights and cluster of one document.
    Document { id: String },
}

fn topic_name(run: &StoredRun, topic: usize) -> String {
    run.summary
        .labels
        .get(topic)
        .map(|label| format!("{}. {}", topic + 1, label.display()))
        .unwrap_or_else(|| format!("{}.", topic + 1))
}

fn show_labels(run: &StoredRun) {
    for label in run.summary.labels.iter() {
        println!("Topic {}", label.topic + 1);
        println!("  prob:  {}", label.prob.join(", "));
        println!("  frex:  {}", label.frex.join(", "));
        println!("  lift:  {}", label.lift.join(", "));
        println!("  score: {}", label.score.join(", "));
    }
}

fn show_prevalence(run: &StoredRun, topic: Option<usize>) -> Result<()> {
    let topic_count = run.model.topic_count;
    let topics: Vec<usize> = match topic {
        Some(t) if t >= 1 && t <= topic_count => vec![t - 1],
        Some(t) => bail!("Topic {} does not exist, the model has {} topics", t, topic_count),
        None => (0..topic_count).collect(),
    };
    println!("Covariate: {}", run.model.covariate.field.name());
    for t in topics {
        println!("{}", topic_name(run, t));
        for level in run.summary.prevalence.iter() {
            println!(
                "  {:<30} {:>6.3} ± {:.3}  ({} documents)",
                level.level, level.mean[t], level.standard_error[t], level.documents
            );
        }
    }
    Ok(())
}

fn show_representative(run: &StoredRun) {
    let metadata = run.pruned.matrix.metadata();
    for (topic, documents) in run.summary.representative.iter().enumerate() {
        println!("{}", topic_name(run, topic));
        for document in documents.iter() {
            let meta = metadata.iter().find(|m| m.id == document.id);
            match meta {
                Some(meta) => println!(
                    "  {:.3}  {} ({} - {})",
                    document.weight, document.id, meta.band, meta.album
                ),
                None => println!("  {:.3}  {}", document.weight, document.id),
            }
        }
    }
}

fn show_clusters(run: &StoredRun) {
    let clustering = &run.similarity.selection.clustering;
    let ids = &run.model.document_ids;
    println!(
        "{} clusters, average silhouette {:.4}",
        clustering.cluster_count(),
        run.similarity.selection.silhouette.average
    );
    for (cluster, medoid) in clustering.medoids.iter().enumerate() {
        let members: Vec<String> = clustering
            .assignments
            .iter()
            .enumerate()
            .filter(|(_, c)| **c == cluster)
            .filter_map(|(document, _)| ids.get(document).map(|id| id.to_string()))
            .collect();
        let medoid_id = ids.get(*medoid).map(|id| id.to_string()).unwrap_or_default();
        println!(
            "Cluster {} (medoid {}, {} documents)",
            cluster + 1,
            medoid_id,
            members.len()
        );
        println!("  {}", members.join(", "));
    }
}

fn show_document(run: &StoredRun, id: &str) -> Result<()> {
    let Some(index) = run.row_of(id) else {
        bail!("Document {} was not modeled, it may have been dropped", id);
    };
    if let Some(meta) = run.pruned.matrix.metadata().get(index) {
        println!("{} ({}, {}, {})", meta.id, meta.band, meta.writer, meta.album);
    }
    for (topic, weight) in run.model.doc_topic[index].iter().enumerate() {
        println!("  {:>6.3}  {}", weight, topic_name(run, topic));
    }
    if let Some(cluster) = run.similarity.selection.clustering.assignments.get(index) {
        println!("Cluster {}", cluster + 1);
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli_args = CliArgs::parse();
    let run = StoredRun::read(&cli_args.output_dir)?;

    match cli_args.command {
        Command::Labels => show_labels(&run),
        Command::Prevalence { topic } => show_prevalence(&run, topic)?,
        Command::Representative => show_representative(&run),
        Command::Clusters => show_clusters(&run),
        Command::Document { id } => show_document(&run, &id)?,
    }
    Ok(())
}
