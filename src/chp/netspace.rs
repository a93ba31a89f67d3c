//! Registry of named nets and their isochronic remote groups.
//!
//! A net is identified by a name and an isochronic region, written
//! `name'region` (region `0` when the suffix is absent). Nets sharing a name
//! are the same physical signal seen at different points of the circuit and
//! belong to one remote group.
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::logic::encoding::Cube;
use crate::net::ids::NetId;
use crate::net::index_vec::IndexVec;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NetNameError {
    #[error("malformed isochronic region in net name `{0}`")]
    BadRegion(String),
    #[error("empty net name")]
    Empty,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
    pub region: u32,
    /// Every net of the same remote group, this one included, ascending.
    pub remote: Vec<NetId>,
}

#[derive(Debug, Clone, Default)]
pub struct NetSpace {
    vars: IndexVec<NetId, Variable>,
    by_name: IndexMap<String, Vec<NetId>>,
}

/// Splits `name'region` into its parts.
pub fn parse_name(text: &str) -> Result<(&str, u32), NetNameError> {
    let (name, region) = match text.rsplit_once('\'') {
        Some((name, region)) => {
            let region = region
                .parse::<u32>()
                .map_err(|_| NetNameError::BadRegion(text.to_string()))?;
            (name, region)
        }
        None => (text, 0),
    };
    if name.is_empty() {
        return Err(NetNameError::Empty);
    }
    Ok((name, region))
}

impl NetSpace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NetId, &Variable)> {
        self.vars.iter_enumerated()
    }

    pub fn variable(&self, net: NetId) -> Option<&Variable> {
        self.vars.get(net)
    }

    /// Exact (name, region) lookup.
    pub fn find(&self, name: &str, region: u32) -> Option<NetId> {
        self.by_name
            .get(name)?
            .iter()
            .copied()
            .find(|net| self.vars[*net].region == region)
    }

    pub fn lookup(&self, text: &str) -> Result<Option<NetId>, NetNameError> {
        let (name, region) = parse_name(text)?;
        Ok(self.find(name, region))
    }

    /// Finds the net named by `text`. A missing net is created when `define`
    /// is set or when the same signal already exists in another region.
    pub fn resolve(&mut self, text: &str, define: bool) -> Result<Option<NetId>, NetNameError> {
        let (name, region) = parse_name(text)?;
        if let Some(net) = self.find(name, region) {
            return Ok(Some(net));
        }
        let known_elsewhere = self.by_name.get(name).is_some_and(|nets| !nets.is_empty());
        if define || known_elsewhere {
            Ok(Some(self.create(name, region)))
        } else {
            Ok(None)
        }
    }

    /// Adds a net, joining the remote group of its same-named nets.
    pub fn create(&mut self, name: &str, region: u32) -> NetId {
        let id = NetId::new(self.vars.len() as u32);
        self.vars.push(Variable {
            name: name.to_string(),
            region,
            remote: vec![id],
        });
        let same_name = self.by_name.entry(name.to_string()).or_default();
        let peer = same_name.first().copied();
        same_name.push(id);
        if let Some(peer) = peer {
            self.connect_remote(id, peer);
        }
        id
    }

    /// Joins the remote groups of `a` and `b`. Every member of the combined
    /// group sees the same membership list.
    pub fn connect_remote(&mut self, a: NetId, b: NetId) {
        let mut group: Vec<NetId> = self.vars[a]
            .remote
            .iter()
            .chain(self.vars[b].remote.iter())
            .copied()
            .collect();
        group.sort();
        group.dedup();
        for member in &group {
            self.vars[*member].remote = group.clone();
        }
    }

    pub fn remote(&self, net: NetId) -> &[NetId] {
        self.vars.get(net).map(|var| var.remote.as_slice()).unwrap_or(&[])
    }

    /// One group per physical signal; together they partition all nets.
    pub fn remote_groups(&self) -> Vec<Vec<NetId>> {
        let mut groups: Vec<Vec<NetId>> = Vec::new();
        for (net, var) in self.vars.iter_enumerated() {
            if var.remote.first() == Some(&net) {
                groups.push(var.remote.clone());
            }
        }
        groups
    }

    /// Spreads every literal of a local assignment to the other regions of
    /// the same signal.
    pub fn project_remote(&self, local: &Cube) -> Cube {
        let mut remote = Cube::new();
        for (net, value) in local.iter() {
            let group = self.remote(net);
            if group.is_empty() {
                remote.insert_concurrent(net, value);
            }
            for member in group {
                remote.insert_concurrent(*member, value);
            }
        }
        remote
    }

    /// `name` or `name'region`.
    pub fn name(&self, net: NetId) -> String {
        match self.vars.get(net) {
            Some(var) if var.region != 0 => format!("{}'{}", var.name, var.region),
            Some(var) => var.name.clone(),
            None => net.to_string(),
        }
    }
}
