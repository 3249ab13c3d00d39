use nalgebra::{Matrix4, Point3, Vector2, Vector3};

use crate::container::BoundingSphere;

use super::types::MODEL_SPHERE_RADIUS_SCALE;

// ─── Tangent basis ────────────────────────────────────────────────────────────

/// Tangent and bitangent of one triangle from its edges and UV deltas.
///
/// Returns zero vectors when the UV deltas are linearly dependent.
pub(super) fn face_tangent_bitangent(
    positions: [Vector3<f32>; 3],
    uvs: [Vector2<f32>; 3],
) -> (Vector3<f32>, Vector3<f32>) {
    let edge_a = positions[1] - positions[0];
    let edge_b = positions[2] - positions[0];
    let uv_a = uvs[1] - uvs[0];
    let uv_b = uvs[2] - uvs[0];

    let determinant = uv_a.x * uv_b.y - uv_b.x * uv_a.y;
    if determinant == 0.0 {
        return (Vector3::zeros(), Vector3::zeros());
    }

    let r = 1.0 / determinant;
    let tangent = (edge_a * uv_b.y - edge_b * uv_a.y) * r;
    let bitangent = (edge_b * uv_a.x - edge_a * uv_b.x) * r;
    (tangent, bitangent)
}

/// Sum each triangle's bitangent into its three vertices.
///
/// Triangles are visited in index-buffer order so the floating point sums
/// are reproducible. Indices must already be validated against the
/// vertex count.
pub(super) fn accumulate_bitangents(
    indices: &[u32],
    positions: &[Vector3<f32>],
    uvs: &[Vector2<f32>],
) -> Vec<Vector3<f32>> {
    let mut accumulated = vec![Vector3::zeros(); positions.len()];

    for triangle in indices.chunks_exact(3) {
        let [a, b, c] = [
            triangle[0] as usize,
            triangle[1] as usize,
            triangle[2] as usize,
        ];
        let (_, bitangent) = face_tangent_bitangent(
            [positions[a], positions[b], positions[c]],
            [uvs[a], uvs[b], uvs[c]],
        );

        accumulated[a] += bitangent;
        accumulated[b] += bitangent;
        accumulated[c] += bitangent;
    }

    accumulated
}

/// Gram-Schmidt: remove the `normal` component of `target` and renormalize.
///
/// A result too short to normalize comes back as zero.
pub(super) fn orthogonalize(target: Vector3<f32>, normal: Vector3<f32>) -> Vector3<f32> {
    let projected = target - normal * normal.dot(&target);
    projected
        .try_normalize(f32::EPSILON)
        .unwrap_or_else(Vector3::zeros)
}

/// Final per-vertex bitangent: orthogonalized, then flipped for mirrored
/// normal maps.
pub(super) fn finalize_bitangent(
    accumulated: Vector3<f32>,
    normal: Vector3<f32>,
) -> Vector3<f32> {
    -orthogonalize(accumulated, normal)
}

// ─── Transforms ───────────────────────────────────────────────────────────────

pub(super) fn transform_position(transform: &Matrix4<f32>, position: Vector3<f32>) -> Vector3<f32> {
    transform.transform_point(&Point3::from(position)).coords
}

/// Transforms a normal by the inverse transpose of the upper 3x3, so
/// translation is ignored and non-uniform scale keeps it perpendicular.
pub(super) fn transform_normal(transform: &Matrix4<f32>, normal: Vector3<f32>) -> Vector3<f32> {
    let linear = transform.fixed_view::<3, 3>(0, 0).into_owned();
    match linear.try_inverse() {
        Some(inverse) => inverse.transpose() * normal,
        None => linear * normal,
    }
}

// ─── Model bounds ─────────────────────────────────────────────────────────────

/// Model-level sphere as stored in the header, with the radius halved.
pub(super) fn model_bounding_sphere(header: BoundingSphere) -> BoundingSphere {
    BoundingSphere {
        center: header.center,
        radius: header.radius * MODEL_SPHERE_RADIUS_SCALE,
    }
}

/// Inverse of [`model_bounding_sphere`].
pub(super) fn header_bounding_sphere(model: BoundingSphere) -> BoundingSphere {
    BoundingSphere {
        center: model.center,
        radius: model.radius / MODEL_SPHERE_RADIUS_SCALE,
    }
}

/// Center and half extents of an axis aligned box.
pub(super) fn volume_from_bounds(
    min: [f32; 3],
    max: [f32; 3],
) -> (Vector3<f32>, Vector3<f32>) {
    let min = Vector3::from(min);
    let max = Vector3::from(max);
    ((max + min) / 2.0, (max - min) / 2.0)
}

/// Inverse of [`volume_from_bounds`].
pub(super) fn bounds_from_volume(
    center: Vector3<f32>,
    size: Vector3<f32>,
) -> ([f32; 3], [f32; 3]) {
    let min = center - size;
    let max = center + size;
    ([min.x, min.y, min.z], [max.x, max.y, max.z])
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{Translation3, UnitQuaternion};

    fn quad() -> (Vec<u32>, Vec<Vector3<f32>>, Vec<Vector2<f32>>) {
        let positions = vec![
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::new(1.0, 0.0, 0.0),
            Vector3::new(1.0, 1.0, 0.0),
            Vector3::new(0.0, 1.0, 0.0),
        ];
        let uvs = positions.iter().map(|p| Vector2::new(p.x, p.y)).collect();
        (vec![0, 1, 2, 0, 2, 3], positions, uvs)
    }

    #[test]
    fn given_flat_quad_when_synthesizing_bitangents_then_shared_vertices_agree() {
        let (indices, positions, uvs) = quad();
        let normal = Vector3::new(0.0, 0.0, 1.0);

        let accumulated = accumulate_bitangents(&indices, &positions, &uvs);
        let bitangents: Vec<_> = accumulated
            .iter()
            .map(|sum| finalize_bitangent(*sum, normal))
            .collect();

        let expected = Vector3::new(0.0, -1.0, 0.0);
        for bitangent in &bitangents {
            assert!((bitangent - expected).norm() < 0.0001);
        }
        // Vertices 0 and 2 are shared by both triangles.
        assert!((bitangents[0] - bitangents[2]).norm() < 0.0001);
    }

    #[test]
    fn given_degenerate_uvs_when_computing_face_basis_then_contribution_is_zero() {
        let positions = [
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::new(1.0, 0.0, 0.0),
            Vector3::new(0.0, 1.0, 0.0),
        ];
        let uvs = [Vector2::zeros(); 3];

        let (tangent, bitangent) = face_tangent_bitangent(positions, uvs);

        assert_eq!(tangent, Vector3::zeros());
        assert_eq!(bitangent, Vector3::zeros());
    }

    #[test]
    fn given_zero_accumulation_when_finalizing_then_result_is_zero_not_nan() {
        let bitangent = finalize_bitangent(Vector3::zeros(), Vector3::new(0.0, 0.0, 1.0));

        assert!(bitangent.iter().all(|component| component.is_finite()));
        assert_eq!(bitangent.norm(), 0.0);
    }

    #[test]
    fn given_tilted_bitangent_when_orthogonalizing_then_normal_component_is_removed() {
        let normal = Vector3::new(0.0, 0.0, 1.0);
        let result = orthogonalize(Vector3::new(0.0, 2.0, 2.0), normal);

        assert!(result.dot(&normal).abs() < 0.0001);
        assert!((result.norm() - 1.0).abs() < 0.0001);
    }

    #[test]
    fn given_translated_rotation_when_transforming_normal_then_translation_is_ignored() {
        let rotation = UnitQuaternion::from_euler_angles(0.0, 0.0, std::f32::consts::FRAC_PI_2);
        let transform =
            Translation3::new(5.0, 6.0, 7.0).to_homogeneous() * rotation.to_homogeneous();

        let normal = transform_normal(&transform, Vector3::new(1.0, 0.0, 0.0));
        let position = transform_position(&transform, Vector3::new(1.0, 0.0, 0.0));

        assert!((normal - Vector3::new(0.0, 1.0, 0.0)).norm() < 0.0001);
        assert!((position - Vector3::new(5.0, 7.0, 7.0)).norm() < 0.0001);
    }

    #[test]
    fn given_header_bounds_when_converting_then_volume_and_sphere_invert() {
        let (center, size) = volume_from_bounds([-1.0, 0.0, -2.0], [1.0, 4.0, 2.0]);
        assert!((center - Vector3::new(0.0, 2.0, 0.0)).norm() < 0.0001);
        assert!((size - Vector3::new(1.0, 2.0, 2.0)).norm() < 0.0001);
        assert_eq!(bounds_from_volume(center, size), ([-1.0, 0.0, -2.0], [1.0, 4.0, 2.0]));

        let header = BoundingSphere {
            center: [0.0, 1.0, 0.0],
            radius: 8.0,
        };
        let model = model_bounding_sphere(header);
        assert_eq!(model.radius, 4.0);
        assert_eq!(header_bounding_sphere(model), header);
    }
}
