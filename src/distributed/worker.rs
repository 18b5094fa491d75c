//! One mapper: repeated color-coding passes over its partition, exchanging boundary rows

use crate::config::Config;
use crate::counting::{ColorSampler, Count, CountingEngine, DynamicTable, RowExchange, TemplatePlan};
use crate::distributed::routing::CommPlan;
use crate::distributed::transport::{Transport, Update, UpdateBatch};
use crate::error::{Result, SubgraphError};
use crate::graph::Graph;
use bytes::Bytes;
use std::collections::HashSet;

/// What a mapper hands back after all iterations
#[derive(Debug, Clone, Default)]
pub struct WorkerReport {
    pub mapper_id: usize,
    pub num_vertices: usize,

    /// Raw root total of every iteration
    pub raw_totals: Vec<Count>,

    /// `sub_totals[iteration][s]`
    pub sub_totals: Vec<Vec<Count>>,

    /// `(global id, mean raw root count)` for every local vertex, when requested
    pub vertex_counts: Option<Vec<(u32, Count)>>,
}

/// Ships this mapper's rows to the mappers that read them, then gathers theirs
struct Exchanger<'a, T: Transport> {
    graph: &'a Graph,
    comm: &'a CommPlan,
    transport: &'a T,
    send_array_limit: usize,
    rotation_pipeline: bool,
    /// Step ids keep increasing across iterations
    step_base: u64,
}

impl<T: Transport> Exchanger<'_, T> {
    /// Nonzero counts of `passive` for every vertex `target` depends on
    fn build_buffer(&self, target: usize, passive: usize, table: &DynamicTable) -> Vec<Update> {
        let mut updates = Vec::new();
        for &v in self.comm.comm_vertices(target) {
            if let Some(row) = table.row(passive, v as usize) {
                let global = self.graph.global_id(v as usize);
                updates.extend(
                    row.iter()
                        .enumerate()
                        .filter(|(_, &count)| count != 0.0)
                        .map(|(c, &count)| (global, c as u32, count)),
                );
            }
        }
        updates
    }

    fn ship(&self, target: usize, step: u64, updates: &[Update]) -> Result<()> {
        for batch in UpdateBatch::chunked(step, updates, self.send_array_limit) {
            self.transport.send(target, batch.encode()?)?;
        }
        Ok(())
    }

    fn apply(&self, step: u64, src: usize, payload: Bytes, remote: &mut DynamicTable) -> Result<bool> {
        let batch = UpdateBatch::decode(&payload)?;
        if batch.step != step {
            return Err(SubgraphError::transport(format!(
                "mapper {} sent step {} chunk {} during step {}",
                src, batch.step, batch.chunk, step
            )));
        }
        for (global, c, count) in batch.updates {
            let slot = self.comm.remote_slot(global).ok_or_else(|| {
                SubgraphError::transport(format!(
                    "mapper {} sent vertex {} which no local vertex neighbours",
                    src, global
                ))
            })?;
            remote.update_comm(slot, c as usize, count)?;
        }
        Ok(batch.last)
    }
}

impl<T: Transport> RowExchange for Exchanger<'_, T> {
    fn exchange(
        &mut self,
        step: u32,
        passive: usize,
        table: &DynamicTable,
        remote: &mut DynamicTable,
    ) -> Result<()> {
        let step = self.step_base + step as u64;
        let targets = self.comm.send_targets(self.rotation_pipeline);

        if self.rotation_pipeline {
            for &target in &targets {
                let updates = self.build_buffer(target, passive, table);
                self.ship(target, step, &updates)?;
            }
        } else {
            let buffers: Vec<(usize, Vec<Update>)> = targets
                .iter()
                .map(|&target| (target, self.build_buffer(target, passive, table)))
                .collect();
            for (target, updates) in &buffers {
                self.ship(*target, step, updates)?;
            }
        }

        let mut pending: HashSet<usize> = self.comm.expected_senders().iter().copied().collect();
        let mut received = 0usize;
        while !pending.is_empty() {
            let (src, payload) = self.transport.recv()?;
            if !pending.contains(&src) {
                return Err(SubgraphError::transport(format!(
                    "unexpected message from mapper {} in step {}",
                    src, step
                )));
            }
            received += payload.len();
            if self.apply(step, src, payload, remote)? {
                pending.remove(&src);
            }
        }

        log::debug!(
            "Mapper {} step {}: sent to {} mappers, received {} bytes",
            self.comm.local_mapper_id(),
            step,
            targets.len(),
            received
        );

        self.transport.barrier()
    }
}

pub struct Worker<'a, T: Transport> {
    plan: &'a TemplatePlan,
    graph: &'a Graph,
    comm: CommPlan,
    transport: T,
    config: &'a Config,
}

impl<'a, T: Transport> Worker<'a, T> {
    pub fn new(
        plan: &'a TemplatePlan,
        graph: &'a Graph,
        comm: CommPlan,
        transport: T,
        config: &'a Config,
    ) -> Self {
        Self {
            plan,
            graph,
            comm,
            transport,
            config,
        }
    }

    /// Run every iteration; on failure peers are released from their barriers
    pub fn run(self) -> Result<WorkerReport> {
        let outcome = self.run_iterations();
        if let Err(e) = &outcome {
            log::error!("Mapper {} failed: {}", self.transport.mapper_id(), e);
            self.transport.abort();
        }
        outcome
    }

    fn run_iterations(&self) -> Result<WorkerReport> {
        let mapper_id = self.transport.mapper_id();
        let comm = &self.comm;
        let mut engine = CountingEngine::new(
            self.plan,
            self.graph,
            comm.remote_len(),
            |global| comm.remote_slot(global),
            self.config.vertex_counts,
        )?;
        let mut sampler = ColorSampler::new(self.config.seed)?;
        let steps_per_pass = (self.plan.subtemplate_count() / 2) as u64;

        let mut report = WorkerReport {
            mapper_id,
            num_vertices: self.graph.num_vertices(),
            ..Default::default()
        };
        let mut vertex_sums = self
            .config
            .vertex_counts
            .then(|| vec![0.0; self.graph.num_vertices()]);

        for iteration in 0..self.config.iterations {
            let colors = sampler.sample(self.graph, self.plan.num_colors(), iteration)?;
            let mut exchanger = Exchanger {
                graph: self.graph,
                comm,
                transport: &self.transport,
                send_array_limit: self.config.send_array_limit,
                rotation_pipeline: self.config.rotation_pipeline,
                step_base: iteration as u64 * steps_per_pass,
            };

            let pass = engine.run_pass(&colors, &mut exchanger)?;
            log::debug!(
                "Mapper {} iteration {}: raw root total {}",
                mapper_id,
                iteration,
                pass.raw_total
            );

            if let (Some(sums), Some(counts)) = (vertex_sums.as_mut(), pass.vertex_counts.as_ref()) {
                for (sum, count) in sums.iter_mut().zip(counts) {
                    *sum += count;
                }
            }
            report.raw_totals.push(pass.raw_total);
            report.sub_totals.push(pass.sub_totals);
        }

        let iterations = self.config.iterations as f64;
        report.vertex_counts = vertex_sums.map(|sums| {
            self.graph
                .vertex_ids()
                .iter()
                .zip(sums)
                .map(|(&global, sum)| (global, sum / iterations))
                .collect()
        });

        Ok(report)
    }
}
