//! # Wiring Graph Extraction
//!
//! Resolves every wire of a diagram back to the two components and port
//! names it joins.

use crate::graph::{Component, Diagram, PinRef};

/// A wire resolved to both of its endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WireEdge<'a> {
    pub component_a: &'a Component,
    pub port_a: &'a str,
    pub component_b: &'a Component,
    pub port_b: &'a str,
}

/// Collect the resolvable wires of `diagram` in insertion order.
///
/// Wires with a dangling endpoint (unknown component, or a pin the
/// component does not list) and wires looping back onto the same component
/// are skipped.
pub fn extract_edges<D: Diagram + ?Sized>(diagram: &D) -> Vec<WireEdge<'_>> {
    let mut edges = Vec::with_capacity(diagram.connections().len());

    for connection in diagram.connections() {
        let Some(component_a) = resolve_endpoint(diagram, &connection.source) else {
            continue;
        };
        let Some(component_b) = resolve_endpoint(diagram, &connection.target) else {
            continue;
        };

        if component_a.id == component_b.id {
            tracing::debug!("[EXTRACT] Skipping self-loop on {}", component_a.id);
            continue;
        }

        edges.push(WireEdge {
            component_a,
            port_a: &connection.source.pin,
            component_b,
            port_b: &connection.target.pin,
        });
    }

    tracing::debug!(
        "[EXTRACT] {} of {} connections resolved",
        edges.len(),
        diagram.connections().len()
    );
    edges
}

fn resolve_endpoint<'a, D: Diagram + ?Sized>(diagram: &'a D, end: &PinRef) -> Option<&'a Component> {
    let Some(component) = diagram.component(&end.component) else {
        tracing::debug!("[EXTRACT] Dangling wire: no component '{}'", end.component);
        return None;
    };

    // Parts without a declared pin list accept any port name
    if !component.pins.is_empty() && component.pin(&end.pin).is_none() {
        tracing::debug!(
            "[EXTRACT] Dangling wire: '{}' has no pin '{}'",
            end.component,
            end.pin
        );
        return None;
    }

    Some(component)
}
