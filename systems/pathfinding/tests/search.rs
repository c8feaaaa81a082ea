use townwalk_core::CellCoord;
use townwalk_system_pathfinding::{PathFinder, RouteFallback};
use townwalk_world::{TileLayout, TileOccupancyMap};

fn open_map(columns: u32, rows: u32) -> TileOccupancyMap {
    TileOccupancyMap::new(TileLayout::open(columns, rows))
}

fn parsed_map(source: &str) -> TileOccupancyMap {
    TileOccupancyMap::new(TileLayout::parse(source).expect("layout parses"))
}

fn assert_contiguous(cells: &[CellCoord]) {
    for pair in cells.windows(2) {
        assert_eq!(
            pair[0].manhattan_distance(pair[1]),
            1,
            "path jumps from {:?} to {:?}",
            pair[0],
            pair[1]
        );
    }
}

#[test]
fn open_grid_paths_have_manhattan_length() {
    let map = open_map(10, 10);
    let finder = PathFinder::default();
    let pairs = [
        (CellCoord::new(0, 0), CellCoord::new(5, 5)),
        (CellCoord::new(9, 0), CellCoord::new(0, 9)),
        (CellCoord::new(3, 7), CellCoord::new(3, 2)),
        (CellCoord::new(4, 4), CellCoord::new(5, 4)),
        (CellCoord::new(8, 1), CellCoord::new(2, 1)),
    ];

    for (start, goal) in pairs {
        let path = finder.find_path(&map, start, goal);
        assert_eq!(
            path.len() as u32,
            start.manhattan_distance(goal) + 1,
            "unexpected length from {start:?} to {goal:?}"
        );
        assert_eq!(path.first(), Some(start));
        assert_eq!(path.last(), Some(goal));
        assert_contiguous(path.cells());
    }
}

#[test]
fn path_to_self_is_empty() {
    let map = open_map(4, 4);
    let finder = PathFinder::default();
    for row in 0..4 {
        for column in 0..4 {
            let cell = CellCoord::new(column, row);
            assert!(finder.find_path(&map, cell, cell).is_empty());
        }
    }
}

#[test]
fn path_routes_around_static_walls() {
    let map = parsed_map(
        "
        .......
        ...#...
        ...#...
        ...#...
        .......
        ",
    );
    let finder = PathFinder::default();

    let path = finder.find_path(&map, CellCoord::new(1, 2), CellCoord::new(5, 2));
    assert!(!path.is_empty());
    assert_contiguous(path.cells());
    for cell in path.cells() {
        assert!(!map.is_static_obstacle(*cell), "stepped onto wall {cell:?}");
    }
    assert_eq!(path.len(), 9);
}

#[test]
fn repeated_searches_are_identical() {
    let map = parsed_map(
        "
        .....
        .....
        ..#..
        .....
        .....
        ",
    );
    let finder = PathFinder::default();

    let first = finder.find_path(&map, CellCoord::new(0, 2), CellCoord::new(4, 2));
    let second = finder.find_path(&map, CellCoord::new(0, 2), CellCoord::new(4, 2));
    assert_eq!(first, second);
}

#[test]
fn enclosed_goal_has_no_route_but_an_adjacent_fallback() {
    let map = parsed_map(
        "
        .......
        ...#...
        ..#.#..
        ...#...
        .......
        ",
    );
    let finder = PathFinder::default();
    let enclosed = CellCoord::new(3, 2);

    for start in [
        CellCoord::new(0, 0),
        CellCoord::new(6, 4),
        CellCoord::new(0, 2),
    ] {
        assert!(finder.find_path(&map, start, enclosed).is_empty());
    }

    let mut partially_open = parsed_map(
        "
        .......
        .......
        ..#.#..
        ...#...
        .......
        ",
    );
    let nearest = finder
        .nearest_walkable(&partially_open, enclosed, 3)
        .expect("north neighbor is walkable");
    assert_eq!(nearest, CellCoord::new(3, 1));

    partially_open.claim(CellCoord::new(3, 1));
    let nearest = finder
        .nearest_walkable(&partially_open, enclosed, 3)
        .expect("diagonal neighbors are walkable");
    assert_eq!(nearest.chebyshev_distance(enclosed), 1);
}

#[test]
fn plan_falls_back_to_nearest_walkable_cell() {
    let map = parsed_map(
        "
        .......
        ...#...
        ..#.#..
        ...#...
        .......
        ",
    );
    let finder = PathFinder::default();
    let start = CellCoord::new(0, 0);
    let enclosed = CellCoord::new(3, 2);

    let route = finder.plan(&map, start, enclosed, RouteFallback::default_nearest());
    assert!(route.is_substitute());
    assert_eq!(route.requested(), enclosed);
    assert_eq!(route.goal().chebyshev_distance(enclosed), 1);
    assert_eq!(route.path().first(), Some(start));
    assert_eq!(route.path().last(), Some(route.goal()));

    let direct = finder.plan(&map, start, enclosed, RouteFallback::None);
    assert!(direct.path().is_empty());
}

#[test]
fn claimed_goal_is_still_reachable() {
    let mut map = open_map(5, 1);
    let occupied = CellCoord::new(4, 0);
    map.claim(occupied);
    let finder = PathFinder::default();

    let path = finder.find_path(&map, CellCoord::new(0, 0), occupied);
    assert_eq!(path.len(), 5);
    assert_eq!(path.last(), Some(occupied));
}

#[test]
fn claimed_cells_are_not_crossed() {
    let mut map = open_map(5, 1);
    map.claim(CellCoord::new(2, 0));
    let finder = PathFinder::default();

    assert!(finder
        .find_path(&map, CellCoord::new(0, 0), CellCoord::new(4, 0))
        .is_empty());
}

#[test]
fn wide_corridor_routes_around_a_claimed_cell() {
    let mut map = parsed_map(
        "
        #######
        .......
        .......
        .......
        #######
        ",
    );
    map.claim(CellCoord::new(3, 2));
    let finder = PathFinder::default();

    let path = finder.find_path(&map, CellCoord::new(0, 2), CellCoord::new(6, 2));
    assert!(!path.is_empty());
    assert!(!path.cells().contains(&CellCoord::new(3, 2)));
    assert_contiguous(path.cells());
    assert_eq!(path.len(), 9);
}

#[test]
fn narrow_corridor_with_a_claimed_cell_has_no_route() {
    let mut map = parsed_map(
        "
        #######
        .......
        #######
        ",
    );
    map.claim(CellCoord::new(3, 1));
    let finder = PathFinder::default();

    assert!(finder
        .find_path(&map, CellCoord::new(0, 1), CellCoord::new(6, 1))
        .is_empty());
}

#[test]
fn expansion_budget_bounds_the_search() {
    let map = open_map(30, 30);
    let start = CellCoord::new(0, 0);
    let goal = CellCoord::new(29, 29);

    let tight = PathFinder::with_max_expansions(10);
    assert!(tight.find_path(&map, start, goal).is_empty());

    let generous = PathFinder::default();
    assert_eq!(generous.find_path(&map, start, goal).len(), 59);
}

#[test]
fn out_of_bounds_goal_has_no_route() {
    let map = open_map(3, 3);
    let finder = PathFinder::default();

    assert!(finder
        .find_path(&map, CellCoord::new(0, 0), CellCoord::new(5, 0))
        .is_empty());
    assert!(finder
        .find_path(&map, CellCoord::new(-1, 0), CellCoord::new(2, 2))
        .is_empty());
}
