use winsys::geometry::Dim;
use winsys::geometry::Pos;
use winsys::geometry::Region;

/// Finds a spot of size `dim` inside `workarea` that overlaps `occupied`
/// as little as possible, preferring spots nearer the top, then the left.
pub fn smart_place(
    dim: Dim,
    workarea: Region,
    occupied: &[Region],
) -> Pos {
    let max_x = std::cmp::max(workarea.right() - dim.w, workarea.pos.x);
    let max_y = std::cmp::max(workarea.bottom() - dim.h, workarea.pos.y);

    let mut xs = vec![workarea.pos.x, max_x];
    let mut ys = vec![workarea.pos.y, max_y];

    for region in occupied {
        xs.push(region.right());
        xs.push(region.pos.x - dim.w);
        ys.push(region.bottom());
        ys.push(region.pos.y - dim.h);
    }

    let clamp = |values: &mut Vec<i32>, min: i32, max: i32| {
        values.retain(|&value| value >= min && value <= max);
        values.sort_unstable();
        values.dedup();
    };

    clamp(&mut xs, workarea.pos.x, max_x);
    clamp(&mut ys, workarea.pos.y, max_y);

    let mut best: Option<(i64, i32, i32)> = None;

    for &y in &ys {
        for &x in &xs {
            let candidate = Region::new(x, y, dim.w, dim.h);
            let overlap = occupied
                .iter()
                .map(|&region| candidate.overlap_area(region))
                .sum::<i64>();

            let key = (overlap, y, x);

            if best.map_or(true, |best| key < best) {
                best = Some(key);
            }
        }
    }

    best.map_or(workarea.pos, |(_, y, x)| Pos::new(x, y))
}

/// Keeps a menu of size `dim` requested at `pos` inside `workarea`; a menu
/// that would cross the right or bottom edge is flipped so that its far
/// edge aligns with it.
pub fn place_menu(
    pos: Pos,
    dim: Dim,
    workarea: Region,
) -> Pos {
    let mut placed = pos;

    if placed.x + dim.w > workarea.right() {
        placed.x = workarea.right() - dim.w;
    }

    if placed.y + dim.h > workarea.bottom() {
        placed.y = workarea.bottom() - dim.h;
    }

    Pos::new(
        std::cmp::max(placed.x, workarea.pos.x),
        std::cmp::max(placed.y, workarea.pos.y),
    )
}

/// Opens a submenu beside the item at `item` of the menu occupying
/// `parent`: to the right, or to the left when that would leave the
/// workarea.
pub fn place_submenu(
    parent: Region,
    item: Region,
    dim: Dim,
    workarea: Region,
) -> Pos {
    let x = if parent.right() + dim.w > workarea.right() {
        parent.pos.x - dim.w
    } else {
        parent.right()
    };

    place_menu(Pos::new(x, item.pos.y), dim, workarea)
}

/// Centers a region of size `dim` on `pos`, kept inside `workarea`.
pub fn center_on(
    pos: Pos,
    dim: Dim,
    workarea: Region,
) -> Pos {
    place_menu(Pos::new(pos.x - dim.w / 2, pos.y - dim.h / 2), dim, workarea)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_workarea_places_top_left() {
        let workarea = Region::new(0, 20, 1000, 700);
        assert_eq!(smart_place(Dim::new(200, 100), workarea, &[]), Pos::new(0, 20));
    }

    #[test]
    fn avoids_overlap_when_possible() {
        let workarea = Region::new(0, 0, 1000, 800);
        let occupied = [Region::new(0, 0, 400, 300)];

        assert_eq!(smart_place(Dim::new(200, 100), workarea, &occupied), Pos::new(400, 0));
    }

    #[test]
    fn minimizes_overlap_when_full() {
        let workarea = Region::new(0, 0, 400, 400);
        let occupied = [Region::new(0, 0, 400, 300), Region::new(0, 300, 200, 100)];

        assert_eq!(smart_place(Dim::new(200, 100), workarea, &occupied), Pos::new(200, 300));

        let occupied = [Region::new(0, 0, 400, 400)];
        assert_eq!(smart_place(Dim::new(200, 100), workarea, &occupied), Pos::new(0, 0));
    }

    #[test]
    fn menus_flip_at_workarea_edges() {
        let workarea = Region::new(0, 0, 1024, 768);
        let dim = Dim::new(150, 200);

        assert_eq!(place_menu(Pos::new(100, 100), dim, workarea), Pos::new(100, 100));
        assert_eq!(place_menu(Pos::new(1000, 700), dim, workarea), Pos::new(874, 568));
        assert_eq!(place_menu(Pos::new(-20, 10), dim, workarea), Pos::new(0, 10));
    }

    #[test]
    fn submenus_open_away_from_the_edge() {
        let workarea = Region::new(0, 0, 1024, 768);
        let item = Region::new(0, 40, 150, 16);

        let pos = place_submenu(Region::new(100, 20, 150, 200), item, Dim::new(150, 100), workarea);
        assert_eq!(pos, Pos::new(250, 40));

        let pos = place_submenu(Region::new(900, 20, 120, 200), item, Dim::new(150, 100), workarea);
        assert_eq!(pos, Pos::new(750, 40));
    }
}
