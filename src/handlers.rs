// Copyright 2025 Cornell University
// released under MIT License

use crate::errors::{Result, TraceError};
use crate::freevars::{block_free_vars, BlockFormat};
use crate::ir::{BinaryOp, Handle, Operation, Triplet, VarToken};
use crate::scanner::Scanner;
use crate::shapes;
use log::debug;
use std::collections::BTreeSet;

fn malformed(message: impl Into<String>) -> TraceError {
    TraceError::MalformedTrace(message.into())
}

/// Header lines of a product block, as read by one of the `ProductLayout`s.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ProductHeader {
    lhs: Triplet,
    rhs: Triplet,
    product: Triplet,
    minimized: Triplet,
    /// offset of the block marker from the `Product` line
    marker_offset: usize,
}

/// Header layouts of a product block, tried in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ProductLayout {
    /// product and minimization reported after two extra lines
    Combined,
    /// product and minimization directly below the `Product` line
    Simple,
}

impl ProductLayout {
    const ATTEMPT_ORDER: [ProductLayout; 2] = [ProductLayout::Combined, ProductLayout::Simple];

    fn step_offset(self) -> usize {
        match self {
            ProductLayout::Combined => 3,
            ProductLayout::Simple => 1,
        }
    }
}

/// Header lines of a projection block.
struct ProjectionHeader {
    var: VarToken,
    operand: Triplet,
    projected: Triplet,
    minimized: Triplet,
}

/// offset of the projection step from the `Projecting` line
const PROJECTION_STEP_OFFSET: usize = 3;

impl<'t> Scanner<'t> {
    fn line(&self, ii: usize) -> Result<&'t str> {
        self.lines
            .get(ii)
            .copied()
            .ok_or_else(|| malformed("trace ends inside an operation block"))
    }

    /// Free-variable tokens of the block announced on line `marker`.
    fn block_vars(&self, marker: usize) -> Result<BTreeSet<VarToken>> {
        let format = BlockFormat::from_marker(self.line(marker)?);
        Ok(block_free_vars(&self.lines[marker + 1..], format))
    }

    fn resolve(&self, tokens: &BTreeSet<VarToken>) -> Result<BTreeSet<String>> {
        self.variables.resolve_all(tokens, self.policy)
    }

    /// Handle of the record `triplet.id` currently denotes.
    fn operand(&self, triplet: &Triplet) -> Result<Handle> {
        Ok(Handle {
            id: triplet.id.clone(),
            size: triplet.size,
            record: self.registry.lookup(&triplet.id)?,
        })
    }

    fn create(
        &mut self,
        triplet: &Triplet,
        name: String,
        free_vars: BTreeSet<VarToken>,
        is_initial: bool,
    ) -> Handle {
        let record = self
            .registry
            .assign(triplet.id.clone(), name, triplet.size, free_vars, is_initial);
        Handle {
            id: triplet.id.clone(),
            size: triplet.size,
            record,
        }
    }

    fn record_name(&self, handle: &Handle) -> &str {
        &self.registry[handle.record].name
    }

    pub(crate) fn handle_init(&mut self, ii: usize) -> Result<usize> {
        let name = self.line(ii)?.to_string();
        let header = shapes::automaton_header(self.line(ii + 1)?).ok_or_else(|| {
            malformed("expected `Automaton (size,generation,id)` below a basic automaton")
        })?;
        let tokens = self.block_vars(ii + 2)?;
        let free_vars = self.resolve(&tokens)?;

        debug!("init {} `{}` ({} states)", header.id, name, header.size);
        let result = self.create(&header, name, tokens, true);
        self.operations.push(Operation::Init { result, free_vars });
        Ok(0)
    }

    pub(crate) fn handle_copy(&mut self, ii: usize) -> Result<usize> {
        let triplets = shapes::triplets(self.line(ii)?);
        let [.., source, destination] = triplets.as_slice() else {
            return Err(malformed("expected source and destination triplets on a `Copying` line"));
        };
        let destination = destination.clone();

        // the source must be looked up before the destination id is reassigned
        let source = self.operand(source)?;
        let record = self
            .registry
            .alias(destination.id.clone(), &source.id, destination.size)?;
        let free_vars = self.resolve(&self.registry[record].free_vars)?;

        debug!("copy {} -> {}", source.id, destination.id);
        self.operations.push(Operation::Copy {
            source,
            result: Handle {
                id: destination.id,
                size: destination.size,
                record,
            },
            free_vars,
        });
        Ok(0)
    }

    pub(crate) fn handle_replace(&mut self, ii: usize) -> Result<usize> {
        let target = shapes::triplets(self.line(ii)?)
            .pop()
            .ok_or_else(|| malformed("expected a target triplet on a `Replacing indices` line"))?;
        let renames: Vec<(VarToken, VarToken)> = self.lines[ii + 1..]
            .iter()
            .map_while(|line| shapes::rename(line))
            .collect();

        let record = self.registry.rename_variables(&target.id, &renames)?;
        let free_vars = self.resolve(&self.registry[record].free_vars)?;

        debug!("replace {} renames in {}", renames.len(), target.id);
        self.operations.push(Operation::Replace {
            target: Handle {
                id: target.id,
                size: target.size,
                record,
            },
            renames,
            free_vars,
        });
        Ok(0)
    }

    pub(crate) fn handle_minimize(&mut self, ii: usize) -> Result<usize> {
        let (from, to) = shapes::minimize_line(self.line(ii)?)
            .ok_or_else(|| malformed("expected `Minimizing (..) -> (..)`"))?;
        let operand = self.operand(&from)?;
        let tokens = self.block_vars(ii + 1)?;
        let free_vars = self.resolve(&tokens)?;

        let name = format!("min({})", self.record_name(&operand));
        debug!("min {} -> {} ({} states)", from.id, to.id, to.size);
        let result = self.create(&to, name, tokens, false);
        self.operations.push(Operation::Minimize {
            operand,
            result,
            free_vars,
        });
        Ok(0)
    }

    /// Reads the product header, trying every layout in `ATTEMPT_ORDER`.
    fn product_header(&self, ii: usize) -> Option<ProductHeader> {
        ProductLayout::ATTEMPT_ORDER.into_iter().find_map(|layout| {
            let step = ii + layout.step_offset();
            let (lhs, rhs, product) = shapes::product_step(self.lines.get(step)?)?;
            let (_, minimized) = shapes::minimize_step(self.lines.get(step + 1)?)?;
            Some(ProductHeader {
                lhs,
                rhs,
                product,
                minimized,
                marker_offset: layout.step_offset() + 2,
            })
        })
    }

    pub(crate) fn handle_product(&mut self, ii: usize, op: BinaryOp) -> Result<usize> {
        let header = self
            .product_header(ii)
            .ok_or_else(|| malformed(format!("no product header below `Product {op}`")))?;
        let lhs = self.operand(&header.lhs)?;
        let rhs = self.operand(&header.rhs)?;
        let tokens = self.block_vars(ii + header.marker_offset)?;
        let free_vars = self.resolve(&tokens)?;

        let name = format!("{} {op} {}", self.record_name(&lhs), self.record_name(&rhs));
        let min_name = format!("min({name})");
        debug!(
            "{op} {} {} -> {} -> {}",
            lhs.id, rhs.id, header.product.id, header.minimized.id
        );
        let product = self.create(&header.product, name, tokens.clone(), false);
        let minimized = self.create(&header.minimized, min_name, tokens, false);
        self.operations.push(Operation::Product {
            op,
            lhs,
            rhs,
            product,
            minimized,
            free_vars,
        });
        Ok(header.marker_offset)
    }

    fn projection_header(&self, ii: usize) -> Result<ProjectionHeader> {
        let var = shapes::projection_marker(self.line(ii)?)
            .ok_or_else(|| malformed("expected `Projecting #<n>`"))?;
        let (operand, projected) =
            shapes::projection_step(self.line(ii + PROJECTION_STEP_OFFSET)?)
                .ok_or_else(|| malformed("expected projection `(..) -> (..)`"))?;
        let (_, minimized) = shapes::minimize_step(self.line(ii + PROJECTION_STEP_OFFSET + 1)?)
            .ok_or_else(|| malformed("expected `Minimizing (..) -> (..)` after a projection"))?;
        Ok(ProjectionHeader {
            var,
            operand,
            projected,
            minimized,
        })
    }

    pub(crate) fn handle_projection(&mut self, ii: usize) -> Result<usize> {
        let header = self.projection_header(ii)?;
        let marker_offset = PROJECTION_STEP_OFFSET + 2;
        let operand = self.operand(&header.operand)?;
        let tokens = self.block_vars(ii + marker_offset)?;
        let free_vars = self.resolve(&tokens)?;

        let name = format!("proj {}({})", header.var, self.record_name(&operand));
        let min_name = format!("min({name})");
        debug!(
            "proj {} {} -> {} -> {}",
            header.var, operand.id, header.projected.id, header.minimized.id
        );
        let projected = self.create(&header.projected, name, tokens.clone(), false);
        let minimized = self.create(&header.minimized, min_name, tokens, false);
        self.operations.push(Operation::Project {
            var: header.var,
            operand,
            projected,
            minimized,
            free_vars,
        });
        Ok(marker_offset)
    }
}
