// tests/import_tests.rs

use std::fs;
use std::io::Write as _;
use std::path::PathBuf;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use glam::vec2;

use tmx_resolve::{
    import_map, DecodedData, Gid, ImportOptions, MapError, ParseMode, FLIP_H,
};

/// Fresh fixture directory under the system temp dir.
fn fixture_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("tmx_resolve_{name}"));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

const TERRAIN_TSX: &str = r#"
    <tileset name="terrain" tilewidth="16" tileheight="16" tilecount="8" columns="4">
      <image source="terrain.png" width="64" height="32"/>
    </tileset>"#;

fn map_with_layer(data: &str) -> String {
    format!(
        r#"<map width="2" height="2" tilewidth="16" tileheight="16">
             <tileset firstgid="1" source="terrain.tsx"/>
             <layer name="ground" width="2" height="2">
               {data}
             </layer>
           </map>"#
    )
}

fn grid_cells(data: &DecodedData) -> Vec<(i32, i32, u32)> {
    data.cells().map(|(x, y, g)| (x, y, g.raw())).collect()
}

#[test]
fn csv_map_with_external_tileset() {
    let dir = fixture_dir("csv_external");
    fs::write(dir.join("terrain.tsx"), TERRAIN_TSX).unwrap();
    fs::write(
        dir.join("level.tmx"),
        map_with_layer(r#"<data encoding="csv">5,0,6,5</data>"#),
    )
    .unwrap();

    let import = import_map(dir.join("level.tmx"), &ImportOptions::default()).unwrap();
    assert!(import.diagnostics.is_empty());

    let map = &import.map;
    assert_eq!(map.registry.len(), 1);
    assert_eq!(
        grid_cells(&map.layers[0].data),
        vec![(0, 0, 5), (1, 0, 0), (0, 1, 6), (1, 1, 5)]
    );

    // GID 5 belongs to terrain and is its fifth tile
    let tile = map.registry.resolve(Gid(5)).unwrap().unwrap();
    assert_eq!(tile.tileset.name, "terrain");
    assert_eq!(tile.local_id, 4);
    assert_eq!(tile.tileset.sheet_origin(4), Some((0, 16)));

    // GID 0 stays empty
    assert!(map.registry.resolve(Gid(0)).unwrap().is_none());

    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn flip_flags_resolve_to_the_same_tile_with_a_mirrored_transform() {
    let dir = fixture_dir("flip_flags");
    fs::write(dir.join("terrain.tsx"), TERRAIN_TSX).unwrap();
    let flipped = 5u32 | FLIP_H;
    fs::write(
        dir.join("level.tmx"),
        map_with_layer(&format!(r#"<data encoding="csv">5,0,0,{flipped}</data>"#)),
    )
    .unwrap();

    let import = import_map(dir.join("level.tmx"), &ImportOptions::default()).unwrap();
    let registry = &import.map.registry;

    let plain = registry.resolve(Gid(5)).unwrap().unwrap();
    let mirrored = registry.resolve(Gid(flipped)).unwrap().unwrap();
    assert_eq!(mirrored.local_id, plain.local_id);
    assert!(mirrored.flip_h);
    assert!(!mirrored.flip_d);

    // A square tile mirrored in place: axes flip, anchor stays put
    assert_eq!(mirrored.transform.translation, vec2(0.0, 0.0));
    let p = mirrored.transform.transform_point2(vec2(1.0, 0.25));
    assert!(p.abs_diff_eq(vec2(-1.0, 0.25), 1e-5));

    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn base64_compressed_layers_decode() -> anyhow::Result<()> {
    let gids: [u32; 4] = [5, 0, 6, 5 | FLIP_H];
    let mut bytes = Vec::new();
    for gid in gids {
        bytes.extend_from_slice(&gid.to_le_bytes());
    }

    let mut gzip = libflate::gzip::Encoder::new(Vec::new())?;
    gzip.write_all(&bytes)?;
    let gzipped = STANDARD.encode(gzip.finish().into_result()?);

    let mut zlib = libflate::zlib::Encoder::new(Vec::new())?;
    zlib.write_all(&bytes)?;
    let zlibbed = STANDARD.encode(zlib.finish().into_result()?);

    for (compression, payload) in [("gzip", &gzipped), ("zlib", &zlibbed)] {
        let dir = fixture_dir(&format!("base64_{compression}"));
        fs::write(dir.join("terrain.tsx"), TERRAIN_TSX)?;
        fs::write(
            dir.join("level.tmx"),
            map_with_layer(&format!(
                r#"<data encoding="base64" compression="{compression}">{payload}</data>"#
            )),
        )?;

        let import = import_map(dir.join("level.tmx"), &ImportOptions::default())?;
        assert_eq!(
            grid_cells(&import.map.layers[0].data),
            vec![
                (0, 0, 5),
                (1, 0, 0),
                (0, 1, 6),
                (1, 1, 5 | FLIP_H),
            ],
            "compression {compression}"
        );
        fs::remove_dir_all(&dir)?;
    }
    Ok(())
}

#[test]
fn infinite_maps_keep_chunk_offsets() {
    let dir = fixture_dir("infinite");
    fs::write(dir.join("terrain.tsx"), TERRAIN_TSX).unwrap();
    fs::write(
        dir.join("level.tmx"),
        r#"<map width="0" height="0" tilewidth="16" tileheight="16" infinite="1">
             <tileset firstgid="1" source="terrain.tsx"/>
             <layer name="sparse">
               <data encoding="csv">
                 <chunk x="-16" y="32" width="2" height="2">1,2,3,4</chunk>
                 <chunk x="64" y="-48" width="2" height="2">5,6,7,8</chunk>
               </data>
             </layer>
           </map>"#,
    )
    .unwrap();

    let import = import_map(dir.join("level.tmx"), &ImportOptions::default()).unwrap();
    assert!(import.map.infinite);

    let cells = grid_cells(&import.map.layers[0].data);
    assert_eq!(cells.len(), 8);
    assert!(cells.contains(&(-16, 32, 1)));
    assert!(cells.contains(&(-15, 33, 4)));
    assert!(cells.contains(&(64, -48, 5)));
    assert!(cells.contains(&(65, -47, 8)));

    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn templated_objects_merge_and_carry_their_own_tileset() {
    let dir = fixture_dir("templates");
    fs::create_dir_all(dir.join("shared")).unwrap();
    fs::write(dir.join("shared/props.tsx"), r#"
        <tileset name="props" tilewidth="16" tileheight="16" tilecount="4" columns="2">
          <image source="props.png" width="32" height="32"/>
        </tileset>"#).unwrap();
    fs::write(dir.join("shared/barrel.tx"), r#"
        <template>
          <tileset firstgid="1" source="props.tsx"/>
          <object name="barrel" type="prop" gid="2" width="16" height="16">
            <properties>
              <property name="flammable" type="bool" value="true"/>
            </properties>
          </object>
        </template>"#).unwrap();
    fs::write(dir.join("terrain.tsx"), TERRAIN_TSX).unwrap();
    fs::write(
        dir.join("level.tmx"),
        r#"<map width="2" height="2" tilewidth="16" tileheight="16">
             <tileset firstgid="1" source="terrain.tsx"/>
             <objectgroup name="props">
               <object id="7" x="16" y="32" template="shared/barrel.tx"/>
               <object id="8" x="48" y="32" gid="6" template="shared/barrel.tx"/>
             </objectgroup>
           </map>"#,
    )
    .unwrap();

    let import = import_map(dir.join("level.tmx"), &ImportOptions::default()).unwrap();
    assert!(import.diagnostics.is_empty());
    let map = &import.map;
    let group = &map.object_groups[0];
    assert_eq!(group.sort_index, 0);

    // Inherited gid: resolved against the template's own tileset
    let inherited = &group.objects[0];
    assert_eq!(inherited.object.name.as_deref(), Some("barrel"));
    assert_eq!(inherited.object.x, Some(16.0));
    assert_eq!(inherited.object.gid, Some(Gid(2)));
    assert_eq!(
        inherited
            .object
            .properties
            .as_ref()
            .unwrap()
            .get_bool("flammable"),
        Some(true)
    );
    let registry = map.object_registry(inherited);
    assert_eq!(registry.resolve(Gid(2)).unwrap().unwrap().tileset.name, "props");

    // Own gid: the map's registry stays in charge
    let own = &group.objects[1];
    assert_eq!(own.object.gid, Some(Gid(6)));
    assert!(own.tileset.is_none());
    assert_eq!(
        map.object_registry(own).resolve(Gid(6)).unwrap().unwrap().tileset.name,
        "terrain"
    );

    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn chained_template_fails_the_import() {
    let dir = fixture_dir("nested_template");
    fs::write(dir.join("terrain.tsx"), TERRAIN_TSX).unwrap();
    fs::write(
        dir.join("a.tx"),
        r#"<template><object name="a" template="b.tx"/></template>"#,
    )
    .unwrap();
    fs::write(
        dir.join("level.tmx"),
        r#"<map width="1" height="1" tilewidth="16" tileheight="16">
             <tileset firstgid="1" source="terrain.tsx"/>
             <objectgroup name="g">
               <object id="1" x="0" y="0" template="a.tx"/>
             </objectgroup>
           </map>"#,
    )
    .unwrap();

    let err = import_map(dir.join("level.tmx"), &ImportOptions::default()).unwrap_err();
    assert!(matches!(err, MapError::NestedTemplate { .. }));

    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn missing_tileset_file_reports_the_path() {
    let dir = fixture_dir("missing_tsx");
    fs::write(
        dir.join("level.tmx"),
        map_with_layer(r#"<data encoding="csv">0,0,0,0</data>"#),
    )
    .unwrap();

    let err = import_map(dir.join("level.tmx"), &ImportOptions::default()).unwrap_err();
    match err {
        MapError::Io { path, .. } => assert!(path.ends_with("terrain.tsx")),
        other => panic!("expected Io error, got {other:?}"),
    }

    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn strict_and_lenient_disagree_about_unknown_attributes() {
    let dir = fixture_dir("modes");
    fs::write(dir.join("terrain.tsx"), TERRAIN_TSX).unwrap();
    fs::write(
        dir.join("level.tmx"),
        r#"<map width="2" height="2" tilewidth="16" tileheight="16" custom="oops">
             <tileset firstgid="1" source="terrain.tsx"/>
             <layer name="ground" width="2" height="2">
               <data encoding="csv">1,2,3,4</data>
             </layer>
           </map>"#,
    )
    .unwrap();

    let strict = ImportOptions {
        mode: ParseMode::Strict,
        ..Default::default()
    };
    let err = import_map(dir.join("level.tmx"), &strict).unwrap_err();
    assert!(matches!(err, MapError::Schema { .. }));

    let import = import_map(dir.join("level.tmx"), &ImportOptions::default()).unwrap();
    assert_eq!(import.diagnostics.len(), 1);
    assert!(import.diagnostics[0].message.contains("custom"));
    assert_eq!(import.map.layers.len(), 1);

    fs::remove_dir_all(&dir).unwrap();
}
