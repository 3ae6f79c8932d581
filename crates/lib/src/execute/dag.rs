//! Action dependency graph.
//!
//! An action depends on another when one of its declared inputs is a declared
//! output of the other. The graph yields parallel execution waves and the set
//! of actions to skip when one fails.

use std::collections::{HashMap, HashSet};

use petgraph::Direction;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::Dfs;

use crate::action::Plan;

use super::types::ExecuteError;

/// A DAG over the actions of a plan, identified by their index in the plan.
pub struct ExecutionDag {
  graph: DiGraph<usize, ()>,
  nodes: Vec<NodeIndex>,
}

impl ExecutionDag {
  /// Build the DAG for a plan.
  ///
  /// Inputs that no action produces are treated as source files.
  pub fn from_plan(plan: &Plan) -> Result<Self, ExecuteError> {
    let mut graph = DiGraph::new();
    let nodes: Vec<NodeIndex> = (0..plan.actions.len()).map(|idx| graph.add_node(idx)).collect();

    let mut producers: HashMap<&str, usize> = HashMap::new();
    for (idx, action) in plan.actions.iter().enumerate() {
      for output in action.outputs() {
        producers.insert(output.exec_path.as_str(), idx);
      }
    }

    for (idx, action) in plan.actions.iter().enumerate() {
      let mut seen = HashSet::new();
      for input in action.inputs() {
        if let Some(&producer) = producers.get(input.exec_path.as_str())
          && seen.insert(producer)
        {
          // Edge from dependency to dependent
          graph.add_edge(nodes[producer], nodes[idx], ());
        }
      }
    }

    toposort(&graph, None).map_err(|_| ExecuteError::CycleDetected)?;

    Ok(Self { graph, nodes })
  }

  pub fn len(&self) -> usize {
    self.nodes.len()
  }

  pub fn is_empty(&self) -> bool {
    self.nodes.is_empty()
  }

  /// Group actions into waves; every action's dependencies are in earlier waves.
  ///
  /// Actions within a wave are listed in plan order.
  pub fn waves(&self) -> Vec<Vec<usize>> {
    let mut in_degree: HashMap<NodeIndex, usize> = self
      .graph
      .node_indices()
      .map(|idx| (idx, self.graph.neighbors_directed(idx, Direction::Incoming).count()))
      .collect();

    let mut remaining: Vec<NodeIndex> = self.nodes.clone();
    let mut waves = Vec::new();

    while !remaining.is_empty() {
      let (ready, rest): (Vec<NodeIndex>, Vec<NodeIndex>) = remaining.into_iter().partition(|idx| in_degree[idx] == 0);

      // from_plan rejected cycles, so every round makes progress.
      debug_assert!(!ready.is_empty());

      for &idx in &ready {
        for neighbor in self.graph.neighbors_directed(idx, Direction::Outgoing) {
          if let Some(deg) = in_degree.get_mut(&neighbor) {
            *deg = deg.saturating_sub(1);
          }
        }
      }

      waves.push(ready.iter().map(|&idx| self.graph[idx]).collect());
      remaining = rest;
    }

    waves
  }

  /// Every action that transitively consumes an output of `action`.
  pub fn dependents(&self, action: usize) -> Vec<usize> {
    let start = self.nodes[action];
    let mut dfs = Dfs::new(&self.graph, start);
    let mut found = Vec::new();

    while let Some(idx) = dfs.next(&self.graph) {
      if idx != start {
        found.push(self.graph[idx]);
      }
    }

    found.sort_unstable();
    found
  }

  /// Direct dependencies of `action`.
  pub fn dependencies(&self, action: usize) -> Vec<usize> {
    let mut deps: Vec<usize> = self
      .graph
      .neighbors_directed(self.nodes[action], Direction::Incoming)
      .map(|idx| self.graph[idx])
      .collect();
    deps.sort_unstable();
    deps
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::action::{Action, ActionCtx, RewriteIncludes};
  use crate::artifact::Artifact;
  use crate::pipeline::{HeaderRule, SourceRule, generate_from_headers, generate_from_sources};
  use crate::rewrite::IncludeRewriteMap;
  use crate::toolchain::Toolchain;

  fn toolchain() -> Toolchain {
    Toolchain::new("/opt/qt/moc")
  }

  fn header_plan(paths: &[&str]) -> Plan {
    let mut ctx = ActionCtx::new("out").unwrap();
    let hdrs = paths.iter().map(|p| Artifact::source(p).unwrap()).collect();
    generate_from_headers(&mut ctx, &toolchain(), &HeaderRule::new("r", hdrs)).unwrap();
    ctx.into_plan()
  }

  #[test]
  fn empty_plan_has_no_waves() {
    let dag = ExecutionDag::from_plan(&ActionCtx::new("out").unwrap().into_plan()).unwrap();
    assert!(dag.is_empty());
    assert!(dag.waves().is_empty());
  }

  #[test]
  fn generation_precedes_rewriting() {
    // Actions: 0 gen foo, 1 rewrite foo, 2 gen baz, 3 rewrite baz
    let dag = ExecutionDag::from_plan(&header_plan(&["foo.h", "bar/baz.h"])).unwrap();

    assert_eq!(dag.waves(), vec![vec![0, 2], vec![1, 3]]);
    assert_eq!(dag.dependencies(1), vec![0]);
    assert_eq!(dag.dependencies(0), Vec::<usize>::new());
  }

  #[test]
  fn source_only_plan_is_a_single_wave() {
    let mut ctx = ActionCtx::new("out").unwrap();
    let srcs = ["a.cpp", "b.cpp", "c.cpp"].iter().map(|p| Artifact::source(p).unwrap()).collect();
    generate_from_sources(&mut ctx, &toolchain(), &SourceRule::new("r", srcs)).unwrap();

    let dag = ExecutionDag::from_plan(&ctx.into_plan()).unwrap();
    assert_eq!(dag.waves(), vec![vec![0, 1, 2]]);
  }

  #[test]
  fn dependents_are_transitive() {
    let mut plan = header_plan(&["foo.h"]);
    // A third action consuming the rewritten source.
    let Action::RewriteIncludes(rw) = plan.actions[1].clone() else {
      panic!("expected rewrite action");
    };
    plan.actions.push(Action::RewriteIncludes(RewriteIncludes {
      template: rw.output.clone(),
      output: Artifact::generated("out", "copy/moc_foo.cpp"),
      map: IncludeRewriteMap::default(),
    }));

    let dag = ExecutionDag::from_plan(&plan).unwrap();

    assert_eq!(dag.dependents(0), vec![1, 2]);
    assert_eq!(dag.dependents(1), vec![2]);
    assert!(dag.dependents(2).is_empty());
    assert_eq!(dag.waves().len(), 3);
  }

  #[test]
  fn cycles_are_rejected() {
    let a = Artifact::generated("out", "a.cpp");
    let b = Artifact::generated("out", "b.cpp");
    let plan = Plan {
      out_dir: "out".to_string(),
      actions: vec![
        Action::RewriteIncludes(RewriteIncludes {
          template: a.clone(),
          output: b.clone(),
          map: IncludeRewriteMap::default(),
        }),
        Action::RewriteIncludes(RewriteIncludes {
          template: b,
          output: a,
          map: IncludeRewriteMap::default(),
        }),
      ],
    };

    assert!(matches!(ExecutionDag::from_plan(&plan), Err(ExecuteError::CycleDetected)));
  }
}
