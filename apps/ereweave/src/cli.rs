//! # CLI Commands
//!
//! One function per subcommand. Each loads its inputs, calls into
//! `ereweave_core` and writes JSON (or plain lines) to stdout or a file.

use ereweave_core::formats::{self, save_snapshot};
use ereweave_core::traversal::paths_between;
use ereweave_core::unifier::{CollapseNaming, collapse};
use ereweave_core::{
    EdgeStep, Graph, GraphStore, HypothesisCollection, HypothesisSearch, NodeKind, QueryDocument,
    Ranker, SearchConfig, Unifier,
};
use serde_json::json;
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::error::Error;
use std::path::{Path, PathBuf};
use tracing::info;

/// Result type shared by every command.
pub type CliResult<T> = Result<T, Box<dyn Error>>;

/// Options of the `search` command beyond its input and output paths.
#[derive(Debug, Clone, Default)]
pub struct SearchOptions {
    /// JSON file with a `SearchConfig`.
    pub config: Option<PathBuf>,
    /// Collapse coreference clusters before searching.
    pub coref: bool,
    /// With `coref`, rename collapsed EREs to fresh canonical names.
    pub canonical: bool,
    /// Override `novelty_top_k`.
    pub top_k: Option<usize>,
    /// Override `max_hypotheses`.
    pub max_hypotheses: Option<usize>,
}

// =============================================================================
// LOADING
// =============================================================================

/// Load a graph from a JSON document or a binary snapshot.
pub fn load_graph(path: &Path) -> CliResult<Graph> {
    let graph = formats::load_graph(path)?;
    info!(
        path = %path.display(),
        nodes = graph.node_count(),
        triples = graph.triple_count(),
        "graph loaded"
    );
    Ok(graph)
}

/// Load the search configuration, applying command-line overrides.
pub fn load_config(options: &SearchOptions) -> CliResult<SearchConfig> {
    let mut config = match &options.config {
        Some(path) => SearchConfig::from_json(&std::fs::read_to_string(path)?)?,
        None => SearchConfig::default(),
    };
    if let Some(top_k) = options.top_k {
        config.novelty_top_k = top_k;
    }
    if let Some(max) = options.max_hypotheses {
        config.max_hypotheses = max;
    }
    config.validate()?;
    Ok(config)
}

fn write_output(text: &str, output: Option<&Path>) -> CliResult<()> {
    match output {
        Some(path) => {
            std::fs::write(path, text)?;
            info!(path = %path.display(), "output written");
        }
        None => println!("{text}"),
    }
    Ok(())
}

// =============================================================================
// SEARCH
// =============================================================================

/// Search every facet, rank each facet's hypotheses, and collect them in
/// facet order.
#[must_use]
pub fn run_search(
    graph: &Graph,
    query: &QueryDocument,
    config: &SearchConfig,
    coref: bool,
    canonical: bool,
) -> HypothesisCollection {
    let (graph, query): (Cow<'_, Graph>, Cow<'_, QueryDocument>) = if coref {
        let unifier = Unifier::from_graph(graph);
        let (naming, names) = if canonical {
            (
                CollapseNaming::Canonical(&config.canonical_prefix),
                unifier.new_canonical_names(&config.canonical_prefix),
            )
        } else {
            (CollapseNaming::Prototype, BTreeMap::new())
        };
        let collapsed = collapse(graph, &unifier, naming);
        let rewritten = QueryDocument {
            facets: query
                .facets
                .iter()
                .map(|f| f.with_unifier(&unifier, &names))
                .collect(),
        };
        (Cow::Owned(collapsed), Cow::Owned(rewritten))
    } else {
        (Cow::Borrowed(graph), Cow::Borrowed(query))
    };

    let search = HypothesisSearch::new(&graph, config.clone());
    let ranker = Ranker::new(&graph, config);
    let ranked: Vec<_> = search
        .run_query(&query)
        .into_iter()
        .map(|hypotheses| ranker.rank(hypotheses))
        .collect();

    let collection = HypothesisCollection::from_hypotheses(
        query
            .facets
            .iter()
            .zip(&ranked)
            .flat_map(|(facet, hypotheses)| hypotheses.iter().map(move |h| (facet, h))),
    );
    info!(
        facets = query.facets.len(),
        hypotheses = collection.len(),
        "search complete"
    );
    collection
}

/// `search`: run a query document against a graph.
pub fn cmd_search(
    graph_path: &Path,
    query_path: &Path,
    output: Option<&Path>,
    options: &SearchOptions,
) -> CliResult<()> {
    let config = load_config(options)?;
    let graph = load_graph(graph_path)?;
    let query = QueryDocument::from_json(&std::fs::read_to_string(query_path)?)?;

    let collection = run_search(&graph, &query, &config, options.coref, options.canonical);
    write_output(&collection.to_json_pretty()?, output)
}

// =============================================================================
// SNAPSHOT
// =============================================================================

/// `snapshot`: convert a graph into the binary snapshot format.
pub fn cmd_snapshot(graph_path: &Path, output: &Path) -> CliResult<()> {
    let graph = load_graph(graph_path)?;
    save_snapshot(&graph, output)?;
    println!(
        "Snapshot written: {} ({} nodes, {} triples)",
        output.display(),
        graph.node_count(),
        graph.triple_count()
    );
    Ok(())
}

// =============================================================================
// PATHS
// =============================================================================

/// Render one path as `a -role-> b <-role- c`.
#[must_use]
pub fn format_path(path: &[EdgeStep]) -> String {
    let Some(first) = path.first() else {
        return String::new();
    };
    let mut out = first.from.clone();
    for step in path {
        let arrow = match step.direction {
            ereweave_core::Direction::Forward => format!(" -{}-> ", step.role),
            ereweave_core::Direction::Backward => format!(" <-{}- ", step.role),
        };
        out.push_str(&arrow);
        out.push_str(&step.to);
    }
    out
}

/// Connecting paths between two nodes, shortest first, skipping the
/// configuration's excluded roles.
#[must_use]
pub fn find_paths(
    graph: &Graph,
    from: &str,
    to: &str,
    max: usize,
    config: &SearchConfig,
) -> Vec<Vec<EdgeStep>> {
    paths_between(graph, from, to, &config.excluded_roles, max)
}

/// `paths`: list connecting paths between two nodes, shortest first.
pub fn cmd_paths(
    graph_path: &Path,
    from: &str,
    to: &str,
    max: usize,
    config_path: Option<&Path>,
) -> CliResult<()> {
    let config = load_config(&SearchOptions {
        config: config_path.map(Path::to_path_buf),
        ..SearchOptions::default()
    })?;
    let graph = load_graph(graph_path)?;
    let paths = find_paths(&graph, from, to, max, &config);
    if paths.is_empty() {
        println!("No path from {from} to {to}");
    }
    for path in &paths {
        println!("{}", format_path(path));
    }
    Ok(())
}

// =============================================================================
// STATUS
// =============================================================================

/// Graph and coreference statistics.
#[must_use]
pub fn graph_status(graph: &Graph) -> serde_json::Value {
    let mut kinds: BTreeMap<String, usize> = BTreeMap::new();
    for label in graph.labels() {
        if let Some(kind) = graph.kind(label) {
            *kinds.entry(kind.to_string()).or_default() += 1;
        }
    }
    let unifier = Unifier::from_graph(graph);
    let merged = unifier
        .clusters()
        .values()
        .filter(|members| members.len() > 1)
        .count();
    json!({
        "nodes": graph.node_count(),
        "triples": graph.triple_count(),
        "eres": graph.eres().count(),
        "statements": kinds.get(&NodeKind::Statement.to_string()).copied().unwrap_or(0),
        "kinds": kinds,
        "coreferenceClasses": merged,
    })
}

/// `status`: print graph statistics as text or JSON.
pub fn cmd_status(graph_path: &Path, as_json: bool) -> CliResult<()> {
    let graph = load_graph(graph_path)?;
    let status = graph_status(&graph);
    if as_json {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }
    println!("Graph: {}", graph_path.display());
    println!("  Nodes:      {}", graph.node_count());
    println!("  Triples:    {}", graph.triple_count());
    println!("  EREs:       {}", status["eres"]);
    println!("  Statements: {}", status["statements"]);
    println!("  Coreference classes: {}", status["coreferenceClasses"]);
    Ok(())
}
