use nalgebra::{Vector2, Vector3};
use rayon::prelude::*;

use crate::container::{ParsedContainer, ParsedMesh};
use crate::error::ConvertError;
use crate::logging::ResultExt;
use crate::project::ConvertSettings;
use crate::skeleton::Skeleton;
use crate::{log_debug, log_info};

use super::accessor::AttributeStream;
use super::geometry::{bounds_from_volume, header_bounding_sphere};
use super::skinning::collect_influences;
use super::types::{
    BAKE1, COLOR_SET1, COLOR_SET5, EXPORT_COLOR_PLACEHOLDER, InterleavedVertex, MAP1, Mesh,
    MeshBinding, Model, NORMAL, POSITION, SUPPORTED_VERSION, Severity, TANGENT, UV_SET, UV_SET1,
    ValidationIssue,
};

/// Secondary UV streams written only when the source object carried them.
const OPTIONAL_UV_STREAMS: [(&str, fn(&InterleavedVertex) -> Vector2<f32>); 3] = [
    (UV_SET, |vertex: &InterleavedVertex| vertex.uv_set),
    (UV_SET1, |vertex: &InterleavedVertex| vertex.uv_set1),
    (BAKE1, |vertex: &InterleavedVertex| vertex.bake1),
];

/// Result of flattening one model.
#[derive(Debug, Clone)]
pub struct ExportReport {
    pub container: ParsedContainer,
    pub issues: Vec<ValidationIssue>,
    /// Names of meshes that failed and were left out of `container`.
    pub skipped_meshes: Vec<String>,
}

/// Flatten every mesh of `model` back into container form.
///
/// A mesh whose weights name a bone the skeleton does not have is left out
/// and reported; the remaining meshes are still written, in model order.
pub fn flatten_model(
    model: &Model,
    skeleton: &dyn Skeleton,
    settings: &ConvertSettings,
) -> ExportReport {
    let results: Vec<Result<ParsedMesh, ConvertError>> = if settings.parallel_meshes {
        model
            .meshes
            .par_iter()
            .map(|mesh| flatten_mesh(mesh, skeleton))
            .collect()
    } else {
        model
            .meshes
            .iter()
            .map(|mesh| flatten_mesh(mesh, skeleton))
            .collect()
    };

    let mut objects = Vec::with_capacity(model.meshes.len());
    let mut issues = Vec::new();
    let mut skipped_meshes = Vec::new();
    for (mesh, result) in model.meshes.iter().zip(results) {
        match result.log_error(Some("export")) {
            Ok(object) => objects.push(object),
            Err(error) => {
                issues.push(ValidationIssue::new(
                    Severity::Error,
                    error.code(),
                    error.to_string(),
                ));
                skipped_meshes.push(mesh.name.clone());
            }
        }
    }

    let (bounding_box_min, bounding_box_max) =
        bounds_from_volume(model.volume_center, model.volume_size);

    log_info!(
        "model {}: flattened {} meshes, skipped {}",
        model.name,
        objects.len(),
        skipped_meshes.len()
    );

    ExportReport {
        container: ParsedContainer {
            major_version: SUPPORTED_VERSION.0,
            minor_version: SUPPORTED_VERSION.1,
            model_name: model.name.clone(),
            bounding_sphere: header_bounding_sphere(model.bounding_sphere),
            bounding_box_min,
            bounding_box_max,
            unknown_section_size: 0,
            objects,
        },
        issues,
        skipped_meshes,
    }
}

/// Decompose one mesh into per-semantic streams and an influence list.
///
/// Skin slots are written as stored, so a single-bind mesh comes back as a
/// rigged mesh weighted fully to its parent bone. Its vertices are already
/// in that bone's space, so the parent bone name is cleared and a reimport
/// does not apply the bone transform again.
///
/// Colour streams always hold [`EXPORT_COLOR_PLACEHOLDER`], not the colours
/// read at import. Vector streams are written with a zero fourth component,
/// so a tangent `w` read from the container does not survive.
pub fn flatten_mesh(mesh: &Mesh, skeleton: &dyn Skeleton) -> Result<ParsedMesh, ConvertError> {
    let influences = collect_influences(&mesh.name, &mesh.vertices, skeleton)?;

    let parent_bone_name = match &mesh.binding {
        MeshBinding::Rigged => mesh.parent_bone_name.clone(),
        MeshBinding::SingleBindCorrected { parent_bone, .. } => {
            log_debug!(
                "mesh {}: writing single-bind vertices in {} space as rigged",
                mesh.name,
                parent_bone
            );
            String::new()
        }
    };

    let mut attributes = vec![
        vector3_stream(POSITION, &mesh.vertices, |vertex| vertex.position),
        vector3_stream(NORMAL, &mesh.vertices, |vertex| vertex.normal),
        vector3_stream(TANGENT, &mesh.vertices, |vertex| vertex.tangent),
        vector2_stream(MAP1, &mesh.vertices, |vertex| vertex.map1),
    ];
    for (semantic, read) in OPTIONAL_UV_STREAMS {
        if mesh.has_source_attribute(semantic) {
            attributes.push(vector2_stream(semantic, &mesh.vertices, read));
        }
    }
    attributes.push(placeholder_color_stream(COLOR_SET1, mesh.vertices.len()));
    if mesh.has_source_attribute(COLOR_SET5) {
        attributes.push(placeholder_color_stream(COLOR_SET5, mesh.vertices.len()));
    }

    Ok(ParsedMesh {
        name: mesh.name.clone(),
        sub_index: mesh.sub_index,
        parent_bone_name,
        bounding_sphere: mesh.bounding_sphere,
        vertex_count: mesh.vertices.len(),
        vertex_indices: mesh.indices.clone(),
        attributes,
        influences,
    })
}

fn vector3_stream(
    semantic: &str,
    vertices: &[InterleavedVertex],
    read: impl Fn(&InterleavedVertex) -> Vector3<f32>,
) -> AttributeStream {
    let records = vertices
        .iter()
        .map(|vertex| {
            let value = read(vertex);
            [value.x, value.y, value.z, 0.0]
        })
        .collect();
    AttributeStream::new(semantic, records)
}

fn vector2_stream(
    semantic: &str,
    vertices: &[InterleavedVertex],
    read: impl Fn(&InterleavedVertex) -> Vector2<f32>,
) -> AttributeStream {
    let records = vertices
        .iter()
        .map(|vertex| {
            let value = read(vertex);
            [value.x, value.y, 0.0, 0.0]
        })
        .collect();
    AttributeStream::new(semantic, records)
}

fn placeholder_color_stream(semantic: &str, vertex_count: usize) -> AttributeStream {
    AttributeStream::new(semantic, vec![EXPORT_COLOR_PLACEHOLDER; vertex_count])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::{BoundingSphere, MeshSource};
    use crate::convert::types::SkinSlots;
    use crate::skeleton::{BoneEntry, BoneTable};
    use nalgebra::Vector4;

    fn skeleton() -> BoneTable {
        let identity = [
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ];
        BoneTable::new(
            ["Trans", "Hip", "Head"]
                .into_iter()
                .map(|name| BoneEntry {
                    name: name.to_string(),
                    world_transform: identity,
                })
                .collect(),
        )
    }

    fn vertex(x: f32, skin: SkinSlots) -> InterleavedVertex {
        InterleavedVertex {
            position: Vector3::new(x, 1.0, 2.0),
            normal: Vector3::new(0.0, 0.0, 1.0),
            tangent: Vector3::new(1.0, 0.0, 0.0),
            bitangent: Vector3::new(0.0, -1.0, 0.0),
            map1: Vector2::new(x, 0.5),
            uv_set: Vector2::new(x, 0.25),
            uv_set1: Vector2::zeros(),
            bake1: Vector2::new(0.75, x),
            skin,
            color_set1: Vector4::new(0.5, 0.5, 0.5, 1.0),
            color_set5: Vector4::new(1.0, 1.0, 1.0, 1.0),
        }
    }

    fn mesh(source_attributes: &[&str], vertices: Vec<InterleavedVertex>) -> Mesh {
        Mesh {
            name: "body".to_string(),
            sub_index: 1,
            parent_bone_name: String::new(),
            bounding_sphere: BoundingSphere {
                center: [0.0, 1.0, 0.0],
                radius: 3.0,
            },
            indices: vec![0, 1, 2],
            vertices,
            binding: MeshBinding::Rigged,
            source_attributes: source_attributes.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn rigged_vertices() -> Vec<InterleavedVertex> {
        vec![
            vertex(
                0.0,
                SkinSlots {
                    bone_indices: [1, 2, 0, 0],
                    weights: [0.6, 0.4, 0.0, 0.0],
                },
            ),
            vertex(1.0, SkinSlots::single(2)),
            vertex(2.0, SkinSlots::default()),
        ]
    }

    #[test]
    fn given_rigged_mesh_when_flattening_then_influences_follow_lane_order() {
        let object = flatten_mesh(&mesh(&[], rigged_vertices()), &skeleton()).expect("bones known");

        let influences: Vec<_> = object
            .influences
            .iter()
            .map(|i| (i.vertex_index, i.bone_name.as_str(), i.weight))
            .collect();
        assert_eq!(
            influences,
            vec![(0, "Hip", 0.6), (0, "Head", 0.4), (1, "Head", 1.0)]
        );
        assert_eq!(object.vertex_count, 3);
        assert_eq!(object.sub_index, 1);
        assert_eq!(object.vertex_indices, vec![0, 1, 2]);
    }

    #[test]
    fn given_mesh_without_optional_sources_when_flattening_then_only_base_streams_are_written() {
        let object = flatten_mesh(&mesh(&[], rigged_vertices()), &skeleton()).expect("bones known");

        assert_eq!(
            object.attribute_names(),
            vec![POSITION, NORMAL, TANGENT, MAP1, COLOR_SET1]
        );
        assert_eq!(
            object.attribute(POSITION).map(|records| records[1]),
            Some([1.0, 1.0, 2.0, 0.0])
        );
    }

    #[test]
    fn given_tangents_when_flattening_then_fourth_component_is_zero() {
        let object = flatten_mesh(&mesh(&[], rigged_vertices()), &skeleton()).expect("bones known");

        let tangents = object.attribute(TANGENT).expect("tangent stream written");
        assert!(tangents.iter().all(|record| *record == [1.0, 0.0, 0.0, 0.0]));
    }

    #[test]
    fn given_mesh_with_optional_sources_when_flattening_then_they_are_written_in_order() {
        let object = flatten_mesh(
            &mesh(&[POSITION, BAKE1, UV_SET, COLOR_SET5], rigged_vertices()),
            &skeleton(),
        )
        .expect("bones known");

        assert_eq!(
            object.attribute_names(),
            vec![POSITION, NORMAL, TANGENT, MAP1, UV_SET, BAKE1, COLOR_SET1, COLOR_SET5]
        );
        assert_eq!(
            object.attribute(BAKE1).map(|records| records[2]),
            Some([0.75, 2.0, 0.0, 0.0])
        );
    }

    #[test]
    fn given_imported_colors_when_flattening_then_placeholder_is_written() {
        let object = flatten_mesh(&mesh(&[COLOR_SET5], rigged_vertices()), &skeleton())
            .expect("bones known");

        for semantic in [COLOR_SET1, COLOR_SET5] {
            let records = object.attribute(semantic).expect("colour stream written");
            assert!(records.iter().all(|r| *r == EXPORT_COLOR_PLACEHOLDER));
        }
    }

    #[test]
    fn given_single_bind_mesh_when_flattening_then_parent_bone_is_cleared() {
        let vertices = rigged_vertices()
            .into_iter()
            .map(|vertex| InterleavedVertex {
                skin: SkinSlots::single(2),
                ..vertex
            })
            .collect();
        let mut single_bind = mesh(&[], vertices);
        single_bind.parent_bone_name = "Head".to_string();
        single_bind.binding = MeshBinding::SingleBindCorrected {
            parent_bone: "Head".to_string(),
            bone_index: 2,
        };

        let object = flatten_mesh(&single_bind, &skeleton()).expect("bones known");

        assert_eq!(object.parent_bone_name, "");
        assert_eq!(object.influences.len(), 3);
        assert!(object.influences.iter().all(|i| i.bone_name == "Head"));
    }

    #[test]
    fn given_rigged_mesh_with_parent_name_when_flattening_then_name_is_kept() {
        let mut rigged = mesh(&[], rigged_vertices());
        rigged.parent_bone_name = "Head".to_string();

        let object = flatten_mesh(&rigged, &skeleton()).expect("bones known");

        assert_eq!(object.parent_bone_name, "Head");
    }

    #[test]
    fn given_bone_index_outside_skeleton_when_flattening_then_error_names_vertex() {
        let mut vertices = rigged_vertices();
        vertices[2].skin = SkinSlots::single(9);

        let error = flatten_mesh(&mesh(&[], vertices), &skeleton()).expect_err("bone 9");

        assert_eq!(
            error,
            ConvertError::UnresolvedBoneIndex {
                mesh: "body".to_string(),
                vertex: 2,
                bone_index: 9,
            }
        );
    }

    #[test]
    fn given_model_with_bad_mesh_when_flattening_model_then_sibling_is_still_written() {
        let mut bad_vertices = rigged_vertices();
        bad_vertices[0].skin = SkinSlots::single(42);
        let mut bad = mesh(&[], bad_vertices);
        bad.name = "bad".to_string();

        let model = Model {
            name: "model".to_string(),
            bounding_sphere: BoundingSphere {
                center: [0.0, 1.0, 0.0],
                radius: 2.0,
            },
            volume_center: Vector3::new(1.0, 1.0, 1.0),
            volume_size: Vector3::new(1.0, 1.0, 1.0),
            meshes: vec![bad, mesh(&[], rigged_vertices())],
        };

        let report = flatten_model(&model, &skeleton(), &ConvertSettings::default());

        assert_eq!(report.skipped_meshes, vec!["bad".to_string()]);
        assert_eq!(report.container.objects.len(), 1);
        assert_eq!(report.container.objects[0].name, "body");
        assert_eq!(report.issues[0].code, "UNRESOLVED_BONE_INDEX");
        assert_eq!(
            (report.container.major_version, report.container.minor_version),
            SUPPORTED_VERSION
        );
        assert_eq!(report.container.bounding_sphere.radius, 4.0);
        assert_eq!(report.container.bounding_box_min, [0.0, 0.0, 0.0]);
        assert_eq!(report.container.bounding_box_max, [2.0, 2.0, 2.0]);
    }
}
