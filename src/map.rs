use crate::error::{DatasetError, Result};
use crate::pose::Planner;
use crate::utils::IoContext;
use crate::{Loc, Map};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BinaryHeap};
use std::path::Path;
use tracing::{debug, trace};

/// An undirected edge with a travel time distribution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeSpec {
  pub from: Loc,
  pub to: Loc,
  /// Mean traversal time, seconds
  pub mean: f64,
  #[serde(default)]
  pub variance: f64,
}

/// On-disk map description
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapSpec {
  pub name: String,
  #[serde(default)]
  pub nodes: Vec<Loc>,
  pub edges: Vec<EdgeSpec>,
  /// Goal poses, grouped by map section
  pub goals: BTreeMap<String, Vec<Loc>>,
}

#[derive(Debug, Copy, Clone)]
struct Arc {
  to: usize,
  mean: f64,
  variance: f64,
}

#[derive(Debug, Clone)]
pub struct MapGraph {
  name: String,
  nodes: Vec<Loc>,
  index: Map<Loc, usize>,
  adj: Vec<Vec<Arc>>,
  goals: BTreeMap<String, Vec<Loc>>,
}

#[derive(Copy, Clone, PartialEq)]
struct State {
  cost: f64,
  node: usize,
}

impl Eq for State {}

impl Ord for State {
  fn cmp(&self, other: &Self) -> Ordering {
    // min-heap on cost, ties broken on node index
    other.cost.partial_cmp(&self.cost)
      .unwrap_or(Ordering::Equal)
      .then_with(|| other.node.cmp(&self.node))
  }
}

impl PartialOrd for State {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
    Some(self.cmp(other))
  }
}

impl MapGraph {
  pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path).read_context(path)?;
    let spec: MapSpec = serde_yaml::from_str(&contents).read_context(path)?;
    Ok(MapGraph::from_spec(spec)?)
  }

  pub fn from_spec(spec: MapSpec) -> Result<Self> {
    let mut nodes = Vec::new();
    let mut index = Map::default();

    let mut add_node = |loc: &Loc, nodes: &mut Vec<Loc>| -> usize {
      *index.entry(loc.clone()).or_insert_with(|| {
        nodes.push(loc.clone());
        nodes.len() - 1
      })
    };

    for n in &spec.nodes {
      add_node(n, &mut nodes);
    }

    let mut arcs = Vec::with_capacity(spec.edges.len());
    for e in &spec.edges {
      if !(e.mean.is_finite() && e.mean >= 0.0 && e.variance.is_finite() && e.variance >= 0.0) {
        return Err(DatasetError::InvalidConfiguration(
          format!("edge {} -- {} has an invalid travel time (mean {}, variance {})", e.from, e.to, e.mean, e.variance)
        ));
      }
      let i = add_node(&e.from, &mut nodes);
      let j = add_node(&e.to, &mut nodes);
      arcs.push((i, j, e.mean, e.variance));
    }

    let mut adj = vec![Vec::new(); nodes.len()];
    for (i, j, mean, variance) in arcs {
      adj[i].push(Arc { to: j, mean, variance });
      adj[j].push(Arc { to: i, mean, variance });
    }

    let graph = MapGraph { name: spec.name, nodes, index, adj, goals: spec.goals };

    for (section, poses) in &graph.goals {
      for pose in poses {
        if !graph.index.contains_key(pose) {
          return Err(DatasetError::InvalidConfiguration(
            format!("goal `{}` of map section `{}` is not a node of map `{}`", pose, section, graph.name)
          ));
        }
      }
    }

    debug!(name=%graph.name, n_nodes=graph.nodes.len(), n_sections=graph.goals.len(), "map loaded");
    Ok(graph)
  }

  pub fn name(&self) -> &str { &self.name }

  pub fn sections(&self) -> impl Iterator<Item=&String> + '_ { self.goals.keys() }

  fn node_index(&self, loc: &Loc) -> Result<usize> {
    self.index.get(loc).copied().ok_or_else(|| DatasetError::UnknownPose(loc.clone()))
  }

  /// Cheapest direct arc between two adjacent nodes.
  fn arc(&self, i: usize, j: usize) -> Option<&Arc> {
    self.adj[i].iter()
      .filter(|a| a.to == j)
      .min_by(|a, b| a.mean.partial_cmp(&b.mean).unwrap_or(Ordering::Equal))
  }
}

impl Planner for MapGraph {
  fn goals(&self, map_sections: &[String]) -> Result<Vec<Loc>> {
    let mut goals = Vec::new();
    for section in map_sections {
      let poses = self.goals.get(section).ok_or_else(|| DatasetError::InvalidConfiguration(
        format!("map `{}` has no section `{}` (valid choices: {})", self.name, section, self.goals.keys().join(" "))
      ))?;
      goals.extend(poses.iter().cloned());
    }
    Ok(goals.into_iter().unique().collect())
  }

  /// Shortest path by mean traversal time (Dijkstra).
  fn get_path(&self, from: &Loc, to: &Loc) -> Result<Vec<Loc>> {
    let source = self.node_index(from)?;
    let target = self.node_index(to)?;

    let mut dist = vec![f64::INFINITY; self.nodes.len()];
    let mut pred: Vec<Option<usize>> = vec![None; self.nodes.len()];
    let mut queue = BinaryHeap::new();
    dist[source] = 0.0;
    queue.push(State { cost: 0.0, node: source });

    while let Some(State { cost, node }) = queue.pop() {
      if node == target {
        break;
      }
      if cost > dist[node] {
        continue;
      }
      for arc in &self.adj[node] {
        let next = cost + arc.mean;
        if next < dist[arc.to] {
          dist[arc.to] = next;
          pred[arc.to] = Some(node);
          queue.push(State { cost: next, node: arc.to });
        }
      }
    }

    if !dist[target].is_finite() {
      return Err(DatasetError::NoPath { from: from.clone(), to: to.clone() });
    }

    let mut path = vec![target];
    let mut current = target;
    while let Some(p) = pred[current] {
      path.push(p);
      current = p;
    }
    path.reverse();
    trace!(%from, %to, cost=dist[target], len=path.len(), "shortest path");
    Ok(path.into_iter().map(|i| self.nodes[i].clone()).collect())
  }

  /// Travel times of consecutive edges are treated as independent, so means and variances add up.
  fn get_estimated_duration(&self, path: &[Loc]) -> Result<(f64, f64)> {
    let mut mean = 0.0;
    let mut variance = 0.0;
    for (a, b) in path.iter().tuple_windows() {
      let i = self.node_index(a)?;
      let j = self.node_index(b)?;
      let arc = self.arc(i, j).ok_or_else(|| DatasetError::NoPath { from: a.clone(), to: b.clone() })?;
      mean += arc.mean;
      variance += arc.variance;
    }
    Ok((mean, variance))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::test::test_data_dir;

  fn loc(s: &str) -> Loc { s.to_string() }

  fn square() -> MapGraph {
    // a --10-- b --10-- c
    //  \______ 25 _____/
    let spec = MapSpec {
      name: "square".into(),
      nodes: vec![],
      edges: vec![
        EdgeSpec { from: loc("a"), to: loc("b"), mean: 10.0, variance: 1.0 },
        EdgeSpec { from: loc("b"), to: loc("c"), mean: 10.0, variance: 3.0 },
        EdgeSpec { from: loc("a"), to: loc("c"), mean: 25.0, variance: 0.0 },
      ],
      goals: vec![("north".to_string(), vec![loc("a"), loc("b")]), ("south".to_string(), vec![loc("b"), loc("c")])]
        .into_iter().collect(),
    };
    MapGraph::from_spec(spec).unwrap()
  }

  #[test]
  fn shortest_path() {
    let g = square();
    assert_eq!(g.get_path(&loc("a"), &loc("c")).unwrap(), vec![loc("a"), loc("b"), loc("c")]);
    assert_eq!(g.get_path(&loc("c"), &loc("a")).unwrap(), vec![loc("c"), loc("b"), loc("a")]);
    assert_eq!(g.get_path(&loc("b"), &loc("b")).unwrap(), vec![loc("b")]);
  }

  #[test]
  fn duration_adds_up() {
    let g = square();
    let path = g.get_path(&loc("a"), &loc("c")).unwrap();
    assert_eq!(g.get_estimated_duration(&path).unwrap(), (20.0, 4.0));
    assert_eq!(g.get_estimated_duration(&[loc("a")]).unwrap(), (0.0, 0.0));
  }

  #[test]
  fn goals_by_section() {
    let g = square();
    assert_eq!(g.goals(&["south".to_string()]).unwrap(), vec![loc("b"), loc("c")]);
    assert_eq!(g.goals(&["north".to_string(), "south".to_string()]).unwrap(), vec![loc("a"), loc("b"), loc("c")]);
    assert!(matches!(g.goals(&["east".to_string()]), Err(DatasetError::InvalidConfiguration(_))));
  }

  #[test]
  fn unknown_and_unreachable() {
    let mut spec = MapSpec { name: "islands".into(), nodes: vec![loc("x")], edges: vec![], goals: BTreeMap::new() };
    spec.edges.push(EdgeSpec { from: loc("a"), to: loc("b"), mean: 1.0, variance: 0.0 });
    let g = MapGraph::from_spec(spec).unwrap();
    assert!(matches!(g.get_path(&loc("a"), &loc("x")), Err(DatasetError::NoPath { .. })));
    assert!(matches!(g.get_path(&loc("a"), &loc("zz")), Err(DatasetError::UnknownPose(_))));
  }

  #[test]
  fn load_from_file() {
    let g = MapGraph::load(test_data_dir().join("campus.yaml")).unwrap();
    assert_eq!(g.name(), "campus");
    assert_eq!(g.sections().cloned().collect::<Vec<_>>(), vec!["faraway", "square", "street"]);
  }
}
