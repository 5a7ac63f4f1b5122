//! Single-vehicle routing model with paired alternatives.
//!
//! Every non-depot node is either mandatory or one half of a disjunction.
//! A feasible route visits every mandatory node once and exactly one member
//! of every disjunction, starting and ending at the depot (which is never
//! listed in the route itself).

use std::fmt;

use crate::{GlsError, GlsResult};

/// Integral arc cost between two node indices.
pub type ArcCost<'a> = Box<dyn Fn(usize, usize) -> i64 + Send + Sync + 'a>;

const NO_DISJUNCTION: usize = usize::MAX;

pub struct RoutingModel<'a> {
    node_count: usize,
    depot: usize,
    arc_cost: ArcCost<'a>,
    alternative: Vec<usize>,
    disjunction_of: Vec<usize>,
    disjunctions: Vec<[usize; 2]>,
    pub(crate) successors: Option<Vec<Vec<usize>>>,
    pub(crate) predecessors: Option<Vec<Vec<usize>>>,
}

impl<'a> RoutingModel<'a> {
    pub fn new(
        node_count: usize,
        depot: usize,
        arc_cost: impl Fn(usize, usize) -> i64 + Send + Sync + 'a,
    ) -> GlsResult<Self> {
        if depot >= node_count {
            return Err(GlsError::invalid_model(format!(
                "depot {depot} is out of range for {node_count} nodes"
            )));
        }

        Ok(Self {
            node_count,
            depot,
            arc_cost: Box::new(arc_cost),
            alternative: (0..node_count).collect(),
            disjunction_of: vec![NO_DISJUNCTION; node_count],
            disjunctions: Vec::new(),
            successors: None,
            predecessors: None,
        })
    }

    /// Makes `a` and `b` mutually exclusive with exactly one of them required.
    pub fn add_disjunction(&mut self, a: usize, b: usize) -> GlsResult<()> {
        for node in [a, b] {
            self.check_node(node)?;
            if node == self.depot {
                return Err(GlsError::invalid_model("the depot cannot join a disjunction"));
            }
            if self.disjunction_of[node] != NO_DISJUNCTION {
                return Err(GlsError::invalid_model(format!(
                    "node {node} already belongs to a disjunction"
                )));
            }
        }
        if a == b {
            return Err(GlsError::invalid_model(format!(
                "disjunction needs two distinct nodes, got {a} twice"
            )));
        }

        let idx = self.disjunctions.len();
        self.disjunctions.push([a, b]);
        self.disjunction_of[a] = idx;
        self.disjunction_of[b] = idx;
        self.alternative[a] = b;
        self.alternative[b] = a;
        Ok(())
    }

    /// Candidate successors per node, best first. Replaces the brute-force
    /// lists the solver would otherwise compute.
    pub fn with_successor_candidates(mut self, lists: Vec<Vec<usize>>) -> GlsResult<Self> {
        self.check_candidate_lists(&lists, "successor")?;
        self.successors = Some(lists);
        Ok(self)
    }

    /// Candidate predecessors per node, best first.
    pub fn with_predecessor_candidates(mut self, lists: Vec<Vec<usize>>) -> GlsResult<Self> {
        self.check_candidate_lists(&lists, "predecessor")?;
        self.predecessors = Some(lists);
        Ok(self)
    }

    pub fn node_count(&self) -> usize {
        self.node_count
    }

    pub fn depot(&self) -> usize {
        self.depot
    }

    #[inline]
    pub fn arc_cost(&self, from: usize, to: usize) -> i64 {
        (self.arc_cost)(from, to)
    }

    /// The other member of `node`'s disjunction, or `node` itself when it
    /// is mandatory (or the depot).
    #[inline]
    pub fn alternative(&self, node: usize) -> usize {
        self.alternative[node]
    }

    pub fn is_mandatory(&self, node: usize) -> bool {
        node != self.depot && self.disjunction_of[node] == NO_DISJUNCTION
    }

    /// Depot → route → depot cost. An empty route costs nothing.
    pub fn route_cost(&self, route: &[usize]) -> i64 {
        let (Some(&first), Some(&last)) = (route.first(), route.last()) else {
            return 0;
        };
        let inner: i64 = route.windows(2).map(|w| self.arc_cost(w[0], w[1])).sum();
        self.arc_cost(self.depot, first) + inner + self.arc_cost(last, self.depot)
    }

    /// Every mandatory node plus the first member of every disjunction, in
    /// node index order.
    pub fn default_route(&self) -> Vec<usize> {
        (0..self.node_count)
            .filter(|&node| {
                if node == self.depot {
                    return false;
                }
                match self.disjunction_of[node] {
                    NO_DISJUNCTION => true,
                    idx => self.disjunctions[idx][0] == node,
                }
            })
            .collect()
    }

    pub fn validate_route(&self, route: &[usize]) -> GlsResult<()> {
        let mut seen = vec![false; self.node_count];
        let mut covered = vec![false; self.disjunctions.len()];

        for &node in route {
            self.check_node(node)
                .map_err(|_| GlsError::invalid_route(format!("node {node} is out of range")))?;
            if node == self.depot {
                return Err(GlsError::invalid_route("the depot cannot appear in a route"));
            }
            if seen[node] {
                return Err(GlsError::invalid_route(format!("node {node} is visited twice")));
            }
            seen[node] = true;

            let idx = self.disjunction_of[node];
            if idx != NO_DISJUNCTION {
                if covered[idx] {
                    let [a, b] = self.disjunctions[idx];
                    return Err(GlsError::invalid_route(format!(
                        "both members of disjunction [{a}, {b}] are visited"
                    )));
                }
                covered[idx] = true;
            }
        }

        if let Some(idx) = covered.iter().position(|&c| !c) {
            let [a, b] = self.disjunctions[idx];
            return Err(GlsError::invalid_route(format!(
                "neither member of disjunction [{a}, {b}] is visited"
            )));
        }
        if let Some(node) = (0..self.node_count).find(|&n| self.is_mandatory(n) && !seen[n]) {
            return Err(GlsError::invalid_route(format!(
                "mandatory node {node} is not visited"
            )));
        }

        Ok(())
    }

    fn check_node(&self, node: usize) -> GlsResult<()> {
        if node < self.node_count {
            Ok(())
        } else {
            Err(GlsError::invalid_model(format!(
                "node {node} is out of range for {} nodes",
                self.node_count
            )))
        }
    }

    fn check_candidate_lists(&self, lists: &[Vec<usize>], kind: &str) -> GlsResult<()> {
        if lists.len() != self.node_count {
            return Err(GlsError::invalid_model(format!(
                "{kind} candidate lists cover {} nodes, expected {}",
                lists.len(),
                self.node_count
            )));
        }
        if let Some(bad) = lists.iter().flatten().find(|&&n| n >= self.node_count) {
            return Err(GlsError::invalid_model(format!(
                "{kind} candidate {bad} is out of range"
            )));
        }
        Ok(())
    }
}

impl fmt::Debug for RoutingModel<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoutingModel")
            .field("node_count", &self.node_count)
            .field("depot", &self.depot)
            .field("disjunctions", &self.disjunctions.len())
            .field("successors", &self.successors.is_some())
            .field("predecessors", &self.predecessors.is_some())
            .finish()
    }
}
