use shapefile as shp;

/// Flatten a shapefile shape into a 2D polygon, dropping any M/Z ordinates.
/// Returns `None` for null shapes and non-polygon geometries.
pub(crate) fn shape_to_polygon(shape: shp::Shape) -> Option<shp::Polygon> {
    /// Rebuild a ring from any point type that exposes x/y.
    fn flatten<P>(ring: &shp::PolygonRing<P>, xy: impl Fn(&P) -> shp::Point) -> shp::PolygonRing<shp::Point> {
        let pts = ring.points().iter().map(xy).collect::<Vec<_>>();
        match ring {
            shp::PolygonRing::Outer(_) => shp::PolygonRing::Outer(pts),
            shp::PolygonRing::Inner(_) => shp::PolygonRing::Inner(pts),
        }
    }

    match shape {
        shp::Shape::Polygon(p) => Some(p),
        shp::Shape::PolygonM(p) => Some(shp::Polygon::with_rings(
            p.rings().iter().map(|r| flatten(r, |pt| shp::Point { x: pt.x, y: pt.y })).collect(),
        )),
        shp::Shape::PolygonZ(p) => Some(shp::Polygon::with_rings(
            p.rings().iter().map(|r| flatten(r, |pt| shp::Point { x: pt.x, y: pt.y })).collect(),
        )),
        _ => None,
    }
}

/// Convert shapefile::Polygon to geo::MultiPolygon<f64>
pub(crate) fn shp_to_geo(p: &shp::Polygon) -> geo::MultiPolygon<f64> {
    /// Ensure first and last are the same for geo::LineString coords
    fn ensure_closed(coords: &mut Vec<geo::Coord<f64>>) {
        if !coords.is_empty() && coords[0] != coords[coords.len() - 1] {
            coords.push(coords[0])
        }
    }

    // Group: each exterior with its following holes (Shapefile stores rings in this order)
    let mut polys: Vec<geo::Polygon<f64>> = Vec::new();
    let mut current_exterior: Option<geo::LineString<f64>> = None;
    let mut current_holes: Vec<geo::LineString<f64>> = Vec::new();

    for ring in p.rings() {
        let mut coords: Vec<geo::Coord<f64>> = ring.points().iter().map(|pt| geo::Coord { x: pt.x, y: pt.y }).collect();
        ensure_closed(&mut coords);
        let ls = geo::LineString(coords);

        match ring {
            shp::PolygonRing::Outer(_) => {
                // flush previous polygon
                if let Some(ext) = current_exterior.take() {
                    polys.push(geo::Polygon::new(ext, std::mem::take(&mut current_holes)));
                }
                current_exterior = Some(ls);
            }
            shp::PolygonRing::Inner(_) => current_holes.push(ls),
        }
    }
    if let Some(ext) = current_exterior {
        polys.push(geo::Polygon::new(ext, current_holes));
    }

    geo::MultiPolygon(polys)
}

/// Convert geo::MultiPolygon<f64> to shapefile::Polygon
pub(crate) fn geo_to_shp(mp: &geo::MultiPolygon<f64>) -> shp::Polygon {
    /// Close a ring of shapefile::Point
    fn ensure_closed(pts: &mut Vec<shp::Point>) {
        if let (Some(first), Some(last)) = (pts.first().copied(), pts.last()) {
            if first.x != last.x || first.y != last.y {
                pts.push(first);
            }
        }
    }

    /// Get the signed area of a shapefile::Point list (negative for hole)
    fn signed_area(pts: &[shp::Point]) -> f64 {
        pts.windows(2).map(|w| w[0].x * w[1].y - w[1].x * w[0].y).sum::<f64>() / 2.0
    }

    // Build a flat list of rings in Shapefile ordering:
    // [ext CW, hole CCW, hole CCW, ..., next ext CW, ...]
    let mut rings: Vec<shp::PolygonRing<shp::Point>> = Vec::new();

    for poly in &mp.0 {
        let mut ext_pts = poly.exterior().points().map(|c| shp::Point::new(c.x(), c.y())).collect::<Vec<_>>();
        ensure_closed(&mut ext_pts);
        if signed_area(&ext_pts) > 0.0 {
            ext_pts.reverse(); // make CW
        }
        rings.push(shp::PolygonRing::Outer(ext_pts));

        for hole in poly.interiors() {
            let mut hole_pts = hole.points().map(|c| shp::Point::new(c.x(), c.y())).collect::<Vec<_>>();
            ensure_closed(&mut hole_pts);
            if signed_area(&hole_pts) < 0.0 {
                hole_pts.reverse(); // make CCW
            }
            rings.push(shp::PolygonRing::Inner(hole_pts));
        }
    }

    shp::Polygon::with_rings(rings)
}
