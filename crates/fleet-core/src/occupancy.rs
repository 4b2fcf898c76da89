use crate::model::{Bot, GridBounds, GridTopology, Node, NodeId, Restaurant};
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};

pub const MAX_STACKED_BOTS: usize = 5;

/// Offset of one bot inside its cell, in units of the rendered bot size,
/// relative to the cell centre (positive y points down).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StackOffset {
    pub x: f32,
    pub y: f32,
}

const fn at(x: f32, y: f32) -> StackOffset {
    StackOffset { x, y }
}

const FORMATIONS: [&[StackOffset]; MAX_STACKED_BOTS] = [
    &[at(0.0, 0.0)],
    &[at(-0.5, 0.0), at(0.5, 0.0)],
    &[at(0.0, -0.6), at(-0.5, 0.4), at(0.5, 0.4)],
    &[
        at(-0.5, -0.5),
        at(0.5, -0.5),
        at(-0.5, 0.5),
        at(0.5, 0.5),
    ],
    &[
        at(-0.5, -0.5),
        at(0.5, -0.5),
        at(-0.5, 0.5),
        at(0.5, 0.5),
        at(0.0, 0.0),
    ],
];

/// Stacking formation for `count` co-located bots. Counts above
/// [`MAX_STACKED_BOTS`] share the five-slot formation; zero maps to the
/// single-bot formation.
pub fn formation(count: usize) -> &'static [StackOffset] {
    FORMATIONS[count.clamp(1, MAX_STACKED_BOTS) - 1]
}

/// Palette index for a bot id: `(id - 1) mod len`, total over all ids.
pub fn palette_slot(bot_id: i64, palette_len: usize) -> usize {
    if palette_len == 0 {
        return 0;
    }
    let len = palette_len as i64;
    (bot_id % len - 1).rem_euclid(len) as usize
}

#[derive(Debug, Clone, PartialEq)]
pub struct BotPlacement<'a> {
    pub bot: &'a Bot,
    pub offset: StackOffset,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CellContent<'a> {
    /// Inside the bounding box but no node is defined here.
    Filler,
    Empty {
        node: &'a Node,
    },
    Delivery {
        node: &'a Node,
    },
    Restaurant {
        node: &'a Node,
        restaurant: &'a Restaurant,
    },
    Bots {
        node: &'a Node,
        placements: Vec<BotPlacement<'a>>,
        hidden: usize,
        restaurant: Option<&'a Restaurant>,
        delivery: bool,
    },
}

impl<'a> CellContent<'a> {
    pub fn node(&self) -> Option<&'a Node> {
        match self {
            CellContent::Filler => None,
            CellContent::Empty { node }
            | CellContent::Delivery { node }
            | CellContent::Restaurant { node, .. }
            | CellContent::Bots { node, .. } => Some(*node),
        }
    }

    pub fn placements(&self) -> &[BotPlacement<'a>] {
        match self {
            CellContent::Bots { placements, .. } => placements,
            _ => &[],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cell<'a> {
    pub x: i32,
    pub y: i32,
    pub content: CellContent<'a>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OccupancyMap<'a> {
    pub bounds: Option<GridBounds>,
    /// Row-major, top row (`min_y`) first.
    pub rows: Vec<Vec<Cell<'a>>>,
    /// Bots with no node, a node the topology does not define, or a node
    /// hidden behind another one at the same coordinate.
    pub unresolved: usize,
}

impl<'a> OccupancyMap<'a> {
    pub fn cell(&self, x: i32, y: i32) -> Option<&Cell<'a>> {
        let bounds = self.bounds?;
        if !bounds.contains(x, y) {
            return None;
        }
        let row = usize::try_from(y - bounds.min_y).ok()?;
        let column = usize::try_from(x - bounds.min_x).ok()?;
        self.rows.get(row)?.get(column)
    }

    pub fn node_cell(&self, node_id: NodeId) -> Option<&Cell<'a>> {
        self.cells()
            .find(|cell| cell.content.node().map(|node| node.id) == Some(node_id))
    }

    pub fn cells(&self) -> impl Iterator<Item = &Cell<'a>> {
        self.rows.iter().flatten()
    }

    pub fn placed_bots(&self) -> usize {
        self.cells().map(|cell| cell.content.placements().len()).sum()
    }
}

/// Maps the latest bot snapshot onto the topology.
///
/// Precedence per cell: bots, then restaurant, then delivery point, then a
/// bare node. Bots keep their reporting order within a cell.
pub fn resolve<'a>(topology: &'a GridTopology, bots: &'a [Bot]) -> OccupancyMap<'a> {
    let Some(bounds) = topology.bounds() else {
        return OccupancyMap {
            bounds: None,
            rows: Vec::new(),
            unresolved: bots.len(),
        };
    };

    let mut node_by_xy: HashMap<(i32, i32), &Node> = HashMap::new();
    let mut known_nodes: HashSet<NodeId> = HashSet::new();
    for node in &topology.nodes {
        // A node shadowed by an earlier one at the same coordinate is never drawn.
        if let Entry::Vacant(slot) = node_by_xy.entry((node.x, node.y)) {
            slot.insert(node);
            known_nodes.insert(node.id);
        }
    }

    let mut restaurant_by_node: HashMap<NodeId, &Restaurant> = HashMap::new();
    for restaurant in &topology.restaurants {
        restaurant_by_node
            .entry(restaurant.node_id)
            .and_modify(|current| {
                if restaurant.id < current.id {
                    *current = restaurant;
                }
            })
            .or_insert(restaurant);
    }

    let delivery_nodes: HashSet<NodeId> =
        topology.delivery_points.iter().map(|node| node.id).collect();

    let mut bots_by_node: HashMap<NodeId, Vec<&Bot>> = HashMap::new();
    let mut unresolved = 0;
    for bot in bots {
        match bot.current_node_id {
            Some(node_id) if known_nodes.contains(&node_id) => {
                bots_by_node.entry(node_id).or_default().push(bot);
            }
            _ => unresolved += 1,
        }
    }

    let mut rows = Vec::with_capacity(bounds.rows() as usize);
    for y in bounds.min_y..=bounds.max_y {
        let mut row = Vec::with_capacity(bounds.columns() as usize);
        for x in bounds.min_x..=bounds.max_x {
            let content = match node_by_xy.get(&(x, y)) {
                None => CellContent::Filler,
                Some(&node) => {
                    let restaurant = restaurant_by_node.get(&node.id).copied();
                    let delivery = node.is_delivery_point || delivery_nodes.contains(&node.id);
                    match bots_by_node.get(&node.id) {
                        Some(group) => stack(node, group, restaurant, delivery),
                        None => match restaurant {
                            Some(restaurant) => CellContent::Restaurant { node, restaurant },
                            None if delivery => CellContent::Delivery { node },
                            None => CellContent::Empty { node },
                        },
                    }
                }
            };
            row.push(Cell { x, y, content });
        }
        rows.push(row);
    }

    OccupancyMap {
        bounds: Some(bounds),
        rows,
        unresolved,
    }
}

fn stack<'a>(
    node: &'a Node,
    group: &[&'a Bot],
    restaurant: Option<&'a Restaurant>,
    delivery: bool,
) -> CellContent<'a> {
    let placements = formation(group.len())
        .iter()
        .zip(group.iter())
        .map(|(offset, bot)| BotPlacement {
            bot: *bot,
            offset: *offset,
        })
        .collect::<Vec<_>>();
    let hidden = group.len().saturating_sub(placements.len());
    CellContent::Bots {
        node,
        placements,
        hidden,
        restaurant,
        delivery,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BotStatus, GridTopology};

    fn bot(id: i64, node: Option<NodeId>) -> Bot {
        Bot {
            id,
            name: format!("Bot-{id}"),
            status: BotStatus::Idle,
            current_node_id: node,
            x: None,
            y: None,
            route: Vec::new(),
            target: None,
            active_orders: 0,
        }
    }

    fn line_topology() -> GridTopology {
        GridTopology {
            nodes: vec![
                Node {
                    id: 1,
                    x: 0,
                    y: 0,
                    is_delivery_point: false,
                    address: "LR00".to_string(),
                },
                Node {
                    id: 2,
                    x: 2,
                    y: 0,
                    is_delivery_point: true,
                    address: "LR20".to_string(),
                },
            ],
            ..GridTopology::default()
        }
    }

    #[test]
    fn formation_table_is_total() {
        assert_eq!(formation(0).len(), 1);
        for count in 1..=MAX_STACKED_BOTS {
            assert_eq!(formation(count).len(), count);
        }
        assert_eq!(formation(9), formation(5));
        assert_eq!(formation(5)[4], StackOffset { x: 0.0, y: 0.0 });
        assert_eq!(formation(2)[0], StackOffset { x: -0.5, y: 0.0 });
    }

    #[test]
    fn palette_slot_wraps_any_id() {
        assert_eq!(palette_slot(1, 5), 0);
        assert_eq!(palette_slot(5, 5), 4);
        assert_eq!(palette_slot(6, 5), 0);
        assert_eq!(palette_slot(0, 5), 4);
        assert_eq!(palette_slot(-3, 5), 1);
        assert_eq!(palette_slot(7, 0), 0);
    }

    #[test]
    fn gap_inside_bounds_is_filler() {
        let topology = line_topology();
        let map = resolve(&topology, &[]);

        assert_eq!(map.rows.len(), 1);
        assert_eq!(map.rows[0].len(), 3);
        assert_eq!(map.cell(1, 0).unwrap().content, CellContent::Filler);
        assert!(matches!(
            map.cell(2, 0).unwrap().content,
            CellContent::Delivery { .. }
        ));
        assert!(map.cell(3, 0).is_none());
    }

    #[test]
    fn six_bots_place_five_and_hide_one() {
        let topology = line_topology();
        let bots: Vec<Bot> = (1..=6).map(|id| bot(id, Some(1))).collect();
        let map = resolve(&topology, &bots);

        let CellContent::Bots {
            placements, hidden, ..
        } = &map.cell(0, 0).unwrap().content
        else {
            panic!("expected bots");
        };
        assert_eq!(placements.len(), 5);
        assert_eq!(*hidden, 1);
        let ids: Vec<i64> = placements.iter().map(|p| p.bot.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);
        assert_eq!(map.placed_bots(), 5);
    }

    #[test]
    fn unresolvable_bots_are_skipped() {
        let topology = line_topology();
        let bots = vec![bot(1, None), bot(2, Some(404)), bot(3, Some(2))];
        let map = resolve(&topology, &bots);

        assert_eq!(map.unresolved, 2);
        let cell = map.node_cell(2).unwrap();
        let CellContent::Bots { delivery, .. } = &cell.content else {
            panic!("expected bots");
        };
        assert!(*delivery);
    }

    #[test]
    fn bots_on_shadowed_node_count_as_unresolved() {
        let mut topology = line_topology();
        topology.nodes.push(Node {
            id: 3,
            x: 0,
            y: 0,
            is_delivery_point: false,
            address: "LR00b".to_string(),
        });
        let bots = vec![bot(1, Some(1)), bot(2, Some(3))];
        let map = resolve(&topology, &bots);

        assert_eq!(map.unresolved, 1);
        assert_eq!(map.placed_bots(), 1);
        assert_eq!(map.node_cell(1).unwrap().content.placements()[0].bot.id, 1);
    }

    #[test]
    fn empty_topology_has_no_cells() {
        let topology = GridTopology::default();
        let bots = vec![bot(1, Some(1))];
        let map = resolve(&topology, &bots);

        assert!(map.rows.is_empty());
        assert_eq!(map.unresolved, 1);
        assert!(map.cell(0, 0).is_none());
    }

    #[test]
    fn lowest_restaurant_id_wins_shared_node() {
        let mut topology = line_topology();
        for (id, name) in [(9, "SUSHI"), (3, "CURRY")] {
            topology.restaurants.push(Restaurant {
                id,
                name: name.to_string(),
                node_id: 1,
                x: 0,
                y: 0,
                address: "LR00".to_string(),
            });
        }
        let map = resolve(&topology, &[]);

        let CellContent::Restaurant { restaurant, .. } = &map.cell(0, 0).unwrap().content else {
            panic!("expected restaurant");
        };
        assert_eq!(restaurant.name, "CURRY");
    }
}
