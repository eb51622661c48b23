//! Canonical on-disk location of a cached tile.

use std::path::{Path, PathBuf};

/// Resolve the cache path for one tile:
/// `{base}/{prefix}/{layer}/{style}/{year}/{matrix_set}/{zoom}/{row}/{col}.{ext}`.
///
/// Pure path arithmetic; the caller creates directories.
#[allow(clippy::too_many_arguments)]
pub fn tile_path(
    base: &Path,
    prefix: &str,
    layer: &str,
    style: &str,
    year: &str,
    matrix_set: &str,
    ext: &str,
    zoom: u32,
    row: i64,
    col: i64,
) -> PathBuf {
    base.join(prefix)
        .join(layer)
        .join(style)
        .join(year)
        .join(matrix_set)
        .join(zoom.to_string())
        .join(row.to_string())
        .join(format!("{}.{}", col, ext))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout() {
        let path = tile_path(
            Path::new("/var/cache/tiles"),
            "tiles/1.0.0",
            "fonds_geo_osm_bdcad_couleur",
            "default",
            "2021",
            "swissgrid_05",
            "png",
            3,
            42,
            17,
        );
        assert_eq!(
            path,
            PathBuf::from(
                "/var/cache/tiles/tiles/1.0.0/fonds_geo_osm_bdcad_couleur/default/2021/swissgrid_05/3/42/17.png"
            )
        );
    }

    #[test]
    fn test_stability() {
        let build = || {
            tile_path(
                Path::new("/data"),
                "tiles/1.0.0",
                "layer",
                "default",
                "2021",
                "swissgrid_05",
                "png",
                0,
                0,
                0,
            )
        };
        assert_eq!(build(), build());
    }
}
