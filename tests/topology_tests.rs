//! Integration tests for volume placement

use needlestore::{
    topology::CURRENT_VERSION, DataNode, ReplicationClass, StoreError, VolumeId, VolumeInfo,
    VolumeLayout,
};

fn volume(vid: u32) -> VolumeInfo {
    VolumeInfo {
        id: VolumeId(vid),
        size: 0,
        replication: ReplicationClass::Copy110,
        version: CURRENT_VERSION,
        read_only: false,
    }
}

// =============================================================================
// Replica Lifecycle
// =============================================================================

#[test]
fn three_replicas_make_a_volume_writable_until_one_drops() {
    let mut layout = VolumeLayout::new(ReplicationClass::Copy110, 1 << 30, 5);
    let v = volume(5);

    for id in ["a", "b"] {
        layout.register_volume(&v, DataNode::new(id, format!("http://{id}:8080")));
        assert_eq!(layout.active_volume_count(), 0);
    }
    layout.register_volume(&v, DataNode::new("c", "http://c:8080"));
    assert_eq!(layout.active_volume_count(), 1);

    let (vid, count, list) = layout.pick_for_write(12).unwrap();
    assert_eq!((vid, count), (VolumeId(5), 12));
    let urls: Vec<&str> = list.nodes().iter().map(|n| n.public_url.as_str()).collect();
    assert_eq!(urls, vec!["http://a:8080", "http://b:8080", "http://c:8080"]);

    // 2 < 3 required copies: unwritable the moment a replica is lost.
    assert!(layout.set_volume_unavailable("a", VolumeId(5)));
    assert_eq!(layout.active_volume_count(), 0);
    assert!(matches!(
        layout.pick_for_write(1),
        Err(StoreError::NoWritableVolumes)
    ));
}

#[test]
fn recovering_the_lost_replica_restores_writability() {
    let mut layout = VolumeLayout::new(ReplicationClass::Copy110, 1 << 30, 5);
    let v = volume(9);
    for id in ["a", "b", "c"] {
        layout.register_volume(&v, DataNode::new(id, format!("http://{id}:8080")));
    }

    layout.set_volume_unavailable("b", VolumeId(9));
    assert_eq!(layout.active_volume_count(), 0);

    assert!(layout.set_volume_available(DataNode::new("b", "http://b:8080"), VolumeId(9)));
    let (vid, _, _) = layout.pick_for_write(1).unwrap();
    assert_eq!(vid, VolumeId(9));
}

// =============================================================================
// Exhaustion
// =============================================================================

#[test]
fn exhaustion_is_an_error_not_a_panic() {
    let mut layout = VolumeLayout::new(ReplicationClass::Copy110, 1 << 30, 5);
    let v = volume(1);
    for id in ["a", "b", "c"] {
        layout.register_volume(&v, DataNode::new(id, format!("http://{id}:8080")));
    }
    layout.set_volume_capacity_full(VolumeId(1));

    for _ in 0..100 {
        assert!(matches!(
            layout.pick_for_write(1),
            Err(StoreError::NoWritableVolumes)
        ));
    }
    // Locations are still known even when nothing is writable.
    assert_eq!(layout.lookup(VolumeId(1)).unwrap().len(), 3);
}
