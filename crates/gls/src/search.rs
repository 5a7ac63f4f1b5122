//! Local search over a single route under an augmented (penalized) cost.
//!
//! The route never contains the depot; extended index `k` addresses the
//! depot-bracketed sequence `[depot, route..., depot]`. Prefix sums over that
//! sequence make segment costs O(1) in both traversal directions, where the
//! reverse direction swaps every node for its disjunction alternative.

use std::{collections::HashMap, time::Instant};

use rand::{SeedableRng, rngs::StdRng, seq::SliceRandom};

use crate::RoutingModel;

const UNROUTED: usize = usize::MAX;
const MAX_SEGMENT_LEN: usize = 3;
const UTILITY_EPSILON: f64 = 1e-9;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum DescentOutcome {
    LocalOptimum,
    Deadline,
}

#[derive(Clone, Copy, Debug)]
struct Reversal {
    delta: i64,
    start: usize,
    end: usize,
}

#[derive(Clone, Copy, Debug)]
struct Relocation {
    delta: i64,
    start: usize,
    end: usize,
    /// Route position of the node the segment is placed after; `None` is the depot.
    after: Option<usize>,
    reversed: bool,
}

pub(crate) struct LocalSearch<'m, 'a> {
    model: &'m RoutingModel<'a>,
    successors: &'m [Vec<usize>],
    predecessors: &'m [Vec<usize>],
    route: Vec<usize>,
    position: Vec<usize>,
    forward: Vec<i64>,
    reverse: Vec<i64>,
    penalties: HashMap<(usize, usize), i64>,
    lambda: i64,
    rng: StdRng,
    deadline: Instant,
    moves: usize,
}

impl<'m, 'a> LocalSearch<'m, 'a> {
    pub(crate) fn new(
        model: &'m RoutingModel<'a>,
        successors: &'m [Vec<usize>],
        predecessors: &'m [Vec<usize>],
        route: Vec<usize>,
        seed: u64,
        deadline: Instant,
    ) -> Self {
        let mut search = Self {
            model,
            successors,
            predecessors,
            route,
            position: vec![UNROUTED; model.node_count()],
            forward: Vec::new(),
            reverse: Vec::new(),
            penalties: HashMap::new(),
            lambda: 0,
            rng: StdRng::seed_from_u64(seed),
            deadline,
            moves: 0,
        };
        search.refresh();
        search
    }

    pub(crate) fn route(&self) -> &[usize] {
        &self.route
    }

    pub(crate) fn moves(&self) -> usize {
        self.moves
    }

    pub(crate) fn lambda(&self) -> i64 {
        self.lambda
    }

    pub(crate) fn set_lambda(&mut self, lambda: i64) {
        self.lambda = lambda;
        self.refresh();
    }

    /// First-improvement descent until no move improves the augmented cost
    /// or the deadline passes.
    pub(crate) fn descend(&mut self) -> DescentOutcome {
        let mut order: Vec<usize> = Vec::with_capacity(self.route.len());
        loop {
            order.clear();
            order.extend(0..self.route.len());
            order.shuffle(&mut self.rng);

            let mut improved = false;
            for &pos in &order {
                if Instant::now() >= self.deadline {
                    return DescentOutcome::Deadline;
                }
                if self.improve_by_reversal(pos) || self.improve_by_relocation(pos) {
                    improved = true;
                }
            }

            if !improved {
                return DescentOutcome::LocalOptimum;
            }
        }
    }

    /// Penalizes the current route's arcs of maximum utility `c / (1 + p)`.
    pub(crate) fn penalize(&mut self) {
        let mut best_utility = f64::NEG_INFINITY;
        let mut chosen: Vec<(usize, usize)> = Vec::new();

        for k in 0..=self.route.len() {
            let arc = (self.at(k), self.at(k + 1));
            let cost = self.model.arc_cost(arc.0, arc.1) as f64;
            let penalty = self.penalties.get(&arc).copied().unwrap_or(0) as f64;
            let utility = cost / (1.0 + penalty);

            if utility > best_utility + UTILITY_EPSILON {
                best_utility = utility;
                chosen.clear();
                chosen.push(arc);
            } else if (utility - best_utility).abs() <= UTILITY_EPSILON {
                chosen.push(arc);
            }
        }

        for arc in chosen {
            *self.penalties.entry(arc).or_insert(0) += 1;
        }
        self.refresh();
    }

    /// Node at extended index `k`.
    #[inline]
    fn at(&self, k: usize) -> usize {
        if k == 0 || k > self.route.len() {
            self.model.depot()
        } else {
            self.route[k - 1]
        }
    }

    #[inline]
    fn augmented(&self, from: usize, to: usize) -> i64 {
        let cost = self.model.arc_cost(from, to);
        if self.lambda == 0 {
            return cost;
        }
        cost + self.lambda * self.penalties.get(&(from, to)).copied().unwrap_or(0)
    }

    /// Cost of the route positions `start..=end` as they are traversed now.
    #[inline]
    fn forward_cost(&self, start: usize, end: usize) -> i64 {
        self.forward[end + 1] - self.forward[start + 1]
    }

    /// Cost of the same positions traversed backwards with alternatives.
    #[inline]
    fn reverse_cost(&self, start: usize, end: usize) -> i64 {
        self.reverse[end + 1] - self.reverse[start + 1]
    }

    fn refresh(&mut self) {
        self.position.fill(UNROUTED);
        for (idx, &node) in self.route.iter().enumerate() {
            self.position[node] = idx;
        }

        self.forward.clear();
        self.reverse.clear();
        self.forward.push(0);
        self.reverse.push(0);
        for k in 0..=self.route.len() {
            let (a, b) = (self.at(k), self.at(k + 1));
            let fwd = self.forward[k] + self.augmented(a, b);
            let rev = self.reverse[k]
                + self.augmented(self.model.alternative(b), self.model.alternative(a));
            self.forward.push(fwd);
            self.reverse.push(rev);
        }
    }

    fn reversal_delta(&self, start: usize, end: usize) -> i64 {
        let alt = |node| self.model.alternative(node);
        let prev = self.at(start);
        let next = self.at(end + 2);
        let first = self.route[start];
        let last = self.route[end];

        self.augmented(prev, alt(last)) + self.reverse_cost(start, end)
            + self.augmented(alt(first), next)
            - self.augmented(prev, first)
            - self.forward_cost(start, end)
            - self.augmented(last, next)
    }

    fn consider_reversal(&self, start: usize, end: usize, best: &mut Option<Reversal>) {
        let delta = self.reversal_delta(start, end);
        if delta < 0 && best.is_none_or(|b| delta < b.delta) {
            *best = Some(Reversal { delta, start, end });
        }
    }

    /// Reverses a segment starting or ending at `pos`, swapping each node for
    /// its alternative. A one-node segment flips that node's orientation.
    fn improve_by_reversal(&mut self, pos: usize) -> bool {
        let (successors, predecessors) = (self.successors, self.predecessors);
        let mut best: Option<Reversal> = None;

        // New first node of a segment starting at `pos`.
        for &candidate in &successors[self.at(pos)] {
            let end = self.position[self.model.alternative(candidate)];
            if end != UNROUTED && end >= pos {
                self.consider_reversal(pos, end, &mut best);
            }
        }
        // New last node of a segment ending at `pos`.
        for &candidate in &predecessors[self.at(pos + 2)] {
            let start = self.position[self.model.alternative(candidate)];
            if start != UNROUTED && start <= pos {
                self.consider_reversal(start, pos, &mut best);
            }
        }

        let Some(best) = best else {
            return false;
        };
        let model = self.model;
        self.route[best.start..=best.end].reverse();
        for node in &mut self.route[best.start..=best.end] {
            *node = model.alternative(*node);
        }
        self.moves += 1;
        self.refresh();
        true
    }

    #[allow(clippy::too_many_arguments)]
    fn consider_relocation(
        &self,
        after_node: usize,
        head: usize,
        tail: usize,
        extra: i64,
        start: usize,
        end: usize,
        reversed: bool,
        best: &mut Option<Relocation>,
    ) {
        let after = if after_node == self.model.depot() {
            None
        } else {
            match self.position[after_node] {
                UNROUTED => return,
                k => Some(k),
            }
        };

        // Skip the segment's own predecessor and the segment itself.
        let after_next = match after {
            None if start == 0 => return,
            None => self.route[0],
            Some(k) if k + 1 >= start && k <= end => return,
            Some(k) => self.at(k + 2),
        };

        let prev = self.at(start);
        let next = self.at(end + 2);
        let removal = self.augmented(prev, self.route[start]) + self.augmented(self.route[end], next)
            - self.augmented(prev, next);
        let insertion = self.augmented(after_node, head) + self.augmented(tail, after_next)
            - self.augmented(after_node, after_next);
        let delta = insertion + extra - removal;

        if delta < 0 && best.is_none_or(|b| delta < b.delta) {
            *best = Some(Relocation {
                delta,
                start,
                end,
                after,
                reversed,
            });
        }
    }

    /// Moves a segment of up to three nodes starting at `pos` elsewhere,
    /// optionally reversed.
    fn improve_by_relocation(&mut self, pos: usize) -> bool {
        let predecessors = self.predecessors;
        let model = self.model;
        let mut best: Option<Relocation> = None;

        for len in 1..=MAX_SEGMENT_LEN {
            let end = pos + len - 1;
            if end >= self.route.len() {
                break;
            }
            let first = self.route[pos];
            let last = self.route[end];

            // Candidate lists never hold the depot, so the front is always tried.
            let depot = model.depot();
            for &after_node in predecessors[first].iter().chain([&depot]) {
                self.consider_relocation(after_node, first, last, 0, pos, end, false, &mut best);
            }

            let head = model.alternative(last);
            let tail = model.alternative(first);
            let flip = self.reverse_cost(pos, end) - self.forward_cost(pos, end);
            for &after_node in predecessors[head].iter().chain([&depot]) {
                self.consider_relocation(after_node, head, tail, flip, pos, end, true, &mut best);
            }
        }

        let Some(best) = best else {
            return false;
        };

        let len = best.end - best.start + 1;
        let mut segment: Vec<usize> = self.route.drain(best.start..=best.end).collect();
        if best.reversed {
            segment.reverse();
            for node in &mut segment {
                *node = model.alternative(*node);
            }
        }
        let insert_at = match best.after {
            None => 0,
            Some(k) if k < best.start => k + 1,
            Some(k) => k + 1 - len,
        };
        self.route.splice(insert_at..insert_at, segment);
        self.moves += 1;
        self.refresh();
        true
    }
}
