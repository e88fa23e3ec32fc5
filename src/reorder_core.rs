use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct BlockId(String);

// Persisted orders may carry numeric ids.
impl<'de> Deserialize<'de> for BlockId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Number(i64),
        }
        Ok(match Raw::deserialize(deserializer)? {
            Raw::Text(text) => Self(text),
            Raw::Number(number) => Self(number.to_string()),
        })
    }
}

impl BlockId {
    pub fn new(entity_id: impl Into<String>) -> Self {
        Self(entity_id.into())
    }

    /// Recovers the entity id from a rendered element id by dropping the
    /// first `prefix_len` characters.
    pub fn from_dom_id(dom_id: &str, prefix_len: usize) -> Result<Self, CoreError> {
        let entity: String = dom_id.chars().skip(prefix_len).collect();
        if entity.is_empty() {
            return Err(CoreError::EmptyEntityId {
                dom_id: dom_id.to_string(),
            });
        }
        Ok(Self(entity))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BlockId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegionId(String);

impl RegionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for RegionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum CoreError {
    #[error("unknown region `{0}`")]
    UnknownRegion(RegionId),
    #[error("block `{block}` is not part of region `{region}`")]
    UnknownBlock { region: RegionId, block: BlockId },
    #[error("block `{0}` appears more than once")]
    DuplicateBlock(BlockId),
    #[error("element id `{dom_id}` carries no entity id after its prefix")]
    EmptyEntityId { dom_id: String },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Block {
    pub id: BlockId,
    pub dom_id: String,
    pub title: String,
}

impl Block {
    pub fn from_dom_id(
        dom_id: impl Into<String>,
        title: impl Into<String>,
        prefix_len: usize,
    ) -> Result<Self, CoreError> {
        let dom_id = dom_id.into();
        Ok(Self {
            id: BlockId::from_dom_id(&dom_id, prefix_len)?,
            dom_id,
            title: title.into(),
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MoveOutcome {
    pub moved: bool,
    pub index: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Direction {
    Left,
    Right,
}

/// Blocks of one region in display order. The vector index is the position.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BlockOrder {
    blocks: Vec<Block>,
}

impl BlockOrder {
    pub fn new(blocks: Vec<Block>) -> Result<Self, CoreError> {
        let mut seen = HashSet::new();
        for block in &blocks {
            if !seen.insert(&block.id) {
                return Err(CoreError::DuplicateBlock(block.id.clone()));
            }
        }
        Ok(Self { blocks })
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Block> {
        self.blocks.iter()
    }

    pub fn ids(&self) -> impl Iterator<Item = &BlockId> {
        self.blocks.iter().map(|block| &block.id)
    }

    pub fn index_of(&self, id: &BlockId) -> Option<usize> {
        self.blocks.iter().position(|block| &block.id == id)
    }

    pub fn move_left(&mut self, index: usize) -> MoveOutcome {
        self.shift(index, Direction::Left)
    }

    pub fn move_right(&mut self, index: usize) -> MoveOutcome {
        self.shift(index, Direction::Right)
    }

    fn shift(&mut self, index: usize, direction: Direction) -> MoveOutcome {
        let neighbour = match direction {
            Direction::Left => index.checked_sub(1),
            Direction::Right => index.checked_add(1).filter(|next| *next < self.blocks.len()),
        };
        match neighbour {
            Some(other) if index < self.blocks.len() => {
                self.blocks.swap(index, other);
                MoveOutcome {
                    moved: true,
                    index: other,
                }
            }
            _ => MoveOutcome {
                moved: false,
                index,
            },
        }
    }

    /// Reorders by `preferred` first, then the remaining blocks in their
    /// current relative order. Ids not present here are ignored.
    fn arrange(&mut self, preferred: &[BlockId]) {
        let mut remaining = std::mem::take(&mut self.blocks);
        let mut arranged = Vec::with_capacity(remaining.len());
        for id in preferred {
            if let Some(pos) = remaining.iter().position(|block| &block.id == id) {
                arranged.push(remaining.remove(pos));
            }
        }
        arranged.extend(remaining);
        self.blocks = arranged;
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Region {
    pub id: RegionId,
    pub title: String,
    pub blocks: BlockOrder,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EditMode {
    #[default]
    View,
    Edit,
}

impl EditMode {
    pub fn toggled(self) -> Self {
        match self {
            EditMode::View => EditMode::Edit,
            EditMode::Edit => EditMode::View,
        }
    }

    pub fn is_editing(self) -> bool {
        self == EditMode::Edit
    }

    /// `display` value for the move buttons of a region.
    pub fn control_display(self) -> &'static str {
        match self {
            EditMode::View => "none",
            EditMode::Edit => "inline",
        }
    }

    /// `display` value for the confirm button of a region.
    pub fn accept_display(self) -> &'static str {
        match self {
            EditMode::View => "none",
            EditMode::Edit => "inline-flex",
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EditModes {
    modes: HashMap<RegionId, EditMode>,
}

impl EditModes {
    pub fn get(&self, region: &RegionId) -> EditMode {
        self.modes.get(region).copied().unwrap_or_default()
    }

    pub fn toggle(&mut self, region: &RegionId) -> EditMode {
        let mode = self.modes.entry(region.clone()).or_default();
        *mode = mode.toggled();
        *mode
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSubmission {
    pub order: Vec<BlockId>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Dashboard {
    regions: Vec<Region>,
    modes: EditModes,
}

impl Dashboard {
    pub fn new(regions: Vec<Region>) -> Result<Self, CoreError> {
        let mut seen = HashSet::new();
        for id in regions.iter().flat_map(|region| region.blocks.ids()) {
            if !seen.insert(id) {
                return Err(CoreError::DuplicateBlock(id.clone()));
            }
        }
        Ok(Self {
            regions,
            modes: EditModes::default(),
        })
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    pub fn region(&self, id: &RegionId) -> Option<&Region> {
        self.regions.iter().find(|region| &region.id == id)
    }

    pub fn mode(&self, region: &RegionId) -> EditMode {
        self.modes.get(region)
    }

    pub fn block_count(&self) -> usize {
        self.regions.iter().map(|region| region.blocks.len()).sum()
    }

    pub fn move_left(&mut self, region: &RegionId, block: &BlockId) -> Result<MoveOutcome, CoreError> {
        self.shift(region, block, Direction::Left)
    }

    pub fn move_right(&mut self, region: &RegionId, block: &BlockId) -> Result<MoveOutcome, CoreError> {
        self.shift(region, block, Direction::Right)
    }

    fn shift(
        &mut self,
        region_id: &RegionId,
        block: &BlockId,
        direction: Direction,
    ) -> Result<MoveOutcome, CoreError> {
        let region = self
            .regions
            .iter_mut()
            .find(|region| &region.id == region_id)
            .ok_or_else(|| CoreError::UnknownRegion(region_id.clone()))?;
        let index = region
            .blocks
            .index_of(block)
            .ok_or_else(|| CoreError::UnknownBlock {
                region: region_id.clone(),
                block: block.clone(),
            })?;
        Ok(region.blocks.shift(index, direction))
    }

    pub fn toggle_edit(&mut self, region: &RegionId) -> Result<EditMode, CoreError> {
        if self.region(region).is_none() {
            return Err(CoreError::UnknownRegion(region.clone()));
        }
        Ok(self.modes.toggle(region))
    }

    /// Entity ids of every block on the page, regions in page order.
    pub fn order_submission(&self) -> OrderSubmission {
        OrderSubmission {
            order: self
                .regions
                .iter()
                .flat_map(|region| region.blocks.ids().cloned())
                .collect(),
        }
    }

    /// Lays regions out from a flat persisted order: each region consumes the
    /// next `len(region)` saved entries, leftovers keep their rendered order.
    pub fn apply_saved_order(&mut self, saved: &[BlockId]) {
        if saved.is_empty() {
            return;
        }
        let mut rest = saved;
        for region in &mut self.regions {
            let take = region.blocks.len().min(rest.len());
            let (head, tail) = rest.split_at(take);
            region.blocks.arrange(head);
            rest = tail;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(dom_id: &str) -> Block {
        Block::from_dom_id(dom_id, dom_id, 3).unwrap()
    }

    fn order(dom_ids: &[&str]) -> BlockOrder {
        BlockOrder::new(dom_ids.iter().map(|id| block(id)).collect()).unwrap()
    }

    fn ids(order: &BlockOrder) -> Vec<&str> {
        order.ids().map(BlockId::as_str).collect()
    }

    fn single_region(dom_ids: &[&str]) -> Dashboard {
        Dashboard::new(vec![Region {
            id: RegionId::new("main"),
            title: "Main".to_string(),
            blocks: order(dom_ids),
        }])
        .unwrap()
    }

    fn submitted(dashboard: &Dashboard) -> Vec<String> {
        dashboard
            .order_submission()
            .order
            .into_iter()
            .map(|id| id.to_string())
            .collect()
    }

    #[test]
    fn strips_fixed_prefix_by_characters() {
        assert_eq!(BlockId::from_dom_id("abc42", 3).unwrap().as_str(), "42");
        assert_eq!(BlockId::from_dom_id("äöü7", 3).unwrap().as_str(), "7");
        assert!(matches!(
            BlockId::from_dom_id("abc", 3),
            Err(CoreError::EmptyEntityId { .. })
        ));
    }

    #[test]
    fn rejects_duplicate_blocks() {
        let blocks = vec![block("abc1"), block("xyz1")];
        assert_eq!(
            BlockOrder::new(blocks),
            Err(CoreError::DuplicateBlock(BlockId::new("1")))
        );

        let result = Dashboard::new(vec![
            Region {
                id: RegionId::new("a"),
                title: String::new(),
                blocks: order(&["abc1"]),
            },
            Region {
                id: RegionId::new("b"),
                title: String::new(),
                blocks: order(&["abc1"]),
            },
        ]);
        assert!(matches!(result, Err(CoreError::DuplicateBlock(_))));
    }

    #[test]
    fn moves_swap_adjacent_blocks() {
        let n = 4;
        for i in 0..n {
            let dom_ids: Vec<String> = (0..n).map(|k| format!("abc{k}")).collect();
            let refs: Vec<&str> = dom_ids.iter().map(String::as_str).collect();

            let mut left = order(&refs);
            let outcome = left.move_left(i);
            if i == 0 {
                assert_eq!(outcome, MoveOutcome { moved: false, index: 0 });
                assert_eq!(left, order(&refs));
            } else {
                assert_eq!(outcome, MoveOutcome { moved: true, index: i - 1 });
                assert_eq!(left.index_of(&BlockId::new(i.to_string())), Some(i - 1));
                assert_eq!(left.index_of(&BlockId::new((i - 1).to_string())), Some(i));
            }

            let mut right = order(&refs);
            let outcome = right.move_right(i);
            if i == n - 1 {
                assert!(!outcome.moved);
                assert_eq!(right, order(&refs));
            } else {
                assert_eq!(outcome, MoveOutcome { moved: true, index: i + 1 });
                assert_eq!(right.index_of(&BlockId::new(i.to_string())), Some(i + 1));
            }
        }
    }

    #[test]
    fn out_of_range_index_is_a_no_op() {
        let original = order(&["abc1", "abc2"]);
        let mut blocks = original.clone();
        assert_eq!(blocks.move_right(usize::MAX), MoveOutcome { moved: false, index: usize::MAX });
        assert_eq!(blocks.move_left(usize::MAX), MoveOutcome { moved: false, index: usize::MAX });
        assert_eq!(blocks.move_left(2), MoveOutcome { moved: false, index: 2 });
        assert_eq!(blocks, original);
        assert!(!blocks.is_empty());
        assert!(BlockOrder::default().is_empty());
    }

    #[test]
    fn left_then_right_restores_order() {
        let original = order(&["abc1", "abc2", "abc3"]);
        let mut blocks = original.clone();
        let outcome = blocks.move_left(2);
        blocks.move_right(outcome.index);
        assert_eq!(blocks, original);

        let mut blocks = original.clone();
        let outcome = blocks.move_right(0);
        blocks.move_left(outcome.index);
        assert_eq!(blocks, original);
    }

    #[test]
    fn move_right_then_submit_scenario() {
        let mut dashboard = single_region(&["abc1", "abc2", "abc3"]);
        let region = RegionId::new("main");
        let outcome = dashboard.move_right(&region, &BlockId::new("1")).unwrap();
        assert_eq!(outcome.index, 1);
        assert_eq!(submitted(&dashboard), vec!["2", "1", "3"]);
    }

    #[test]
    fn submission_strips_prefix_in_order() {
        let dashboard = single_region(&["abcX", "abcY", "abcZ"]);
        assert_eq!(submitted(&dashboard), vec!["X", "Y", "Z"]);
        let json = serde_json::to_string(&dashboard.order_submission()).unwrap();
        assert_eq!(json, r#"{"order":["X","Y","Z"]}"#);
    }

    #[test]
    fn empty_dashboard_submits_empty_order() {
        let dashboard = Dashboard::default();
        let json = serde_json::to_string(&dashboard.order_submission()).unwrap();
        assert_eq!(json, r#"{"order":[]}"#);
    }

    #[test]
    fn moves_report_unknown_targets() {
        let mut dashboard = single_region(&["abc1"]);
        assert!(matches!(
            dashboard.move_left(&RegionId::new("other"), &BlockId::new("1")),
            Err(CoreError::UnknownRegion(_))
        ));
        assert!(matches!(
            dashboard.move_right(&RegionId::new("main"), &BlockId::new("9")),
            Err(CoreError::UnknownBlock { .. })
        ));
    }

    #[test]
    fn toggle_is_per_region_and_involutive() {
        let mut dashboard = Dashboard::new(vec![
            Region {
                id: RegionId::new("a"),
                title: String::new(),
                blocks: order(&["abc1"]),
            },
            Region {
                id: RegionId::new("b"),
                title: String::new(),
                blocks: order(&["abc2"]),
            },
        ])
        .unwrap();
        let a = RegionId::new("a");
        let b = RegionId::new("b");

        assert_eq!(dashboard.mode(&a), EditMode::View);
        assert_eq!(dashboard.toggle_edit(&a).unwrap(), EditMode::Edit);
        assert_eq!(dashboard.mode(&b), EditMode::View);
        assert_eq!(dashboard.mode(&a).control_display(), "inline");
        assert_eq!(dashboard.mode(&a).accept_display(), "inline-flex");

        assert_eq!(dashboard.toggle_edit(&a).unwrap(), EditMode::View);
        assert_eq!(dashboard.mode(&a).control_display(), "none");
        assert_eq!(dashboard.mode(&a).accept_display(), "none");

        assert!(dashboard.toggle_edit(&RegionId::new("c")).is_err());
    }

    #[test]
    fn saved_order_is_consumed_region_by_region() {
        let mut dashboard = Dashboard::new(vec![
            Region {
                id: RegionId::new("a"),
                title: String::new(),
                blocks: order(&["dev1", "dev2", "dev3"]),
            },
            Region {
                id: RegionId::new("b"),
                title: String::new(),
                blocks: order(&["dev4", "dev5"]),
            },
        ])
        .unwrap();

        let saved: Vec<BlockId> = ["3", "1", "99", "5", "4"]
            .into_iter()
            .map(BlockId::new)
            .collect();
        dashboard.apply_saved_order(&saved);

        assert_eq!(ids(&dashboard.regions()[0].blocks), vec!["3", "1", "2"]);
        assert_eq!(ids(&dashboard.regions()[1].blocks), vec!["5", "4"]);
    }

    #[test]
    fn empty_saved_order_keeps_rendered_order() {
        let mut dashboard = single_region(&["abc1", "abc2"]);
        dashboard.apply_saved_order(&[]);
        assert_eq!(submitted(&dashboard), vec!["1", "2"]);
    }
}
