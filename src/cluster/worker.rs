use std::sync::{Arc, Mutex};

use bevy::prelude::*;
use bevy::tasks::{AsyncComputeTaskPool, Task};
use bevy_tasks::futures_lite::future;
use crossbeam_channel::{Receiver, Sender, bounded};
use rstar::RTree;
use uuid::Uuid;

use super::build_clusters;
use crate::types::{BBox, PointCollection, PointFeature};

/// Queues re-cluster requests and runs them on the async compute pool. Only
/// the most recently queued request id is considered live: an in-flight
/// computation superseded by a newer viewport event drops its result instead
/// of racing it.
#[derive(Resource)]
pub struct ClusterWorker {
    pending: Arc<Mutex<Vec<ClusterRequest>>>,
    active_tasks: Arc<Mutex<usize>>,
    max_concurrent: usize,
    latest: Arc<Mutex<Uuid>>,
    tx: Sender<ClusterResult>,
}

pub struct ClusterRequest {
    id: Uuid,
    points: Arc<RTree<PointFeature>>,
    bbox: BBox,
    zoom: i32,
    radius_px: f64,
    tile_quality: f64,
}

type ClusterResult = (Uuid, Vec<PointFeature>);

#[derive(Resource, Deref)]
pub struct ClusterReceiver(pub Receiver<ClusterResult>);

impl ClusterWorker {
    pub fn new(max_workers: usize, tx: Sender<ClusterResult>) -> Self {
        ClusterWorker {
            pending: Arc::new(Mutex::new(Vec::new())),
            active_tasks: Arc::new(Mutex::new(0)),
            max_concurrent: max_workers,
            latest: Arc::new(Mutex::new(Uuid::nil())),
            tx,
        }
    }

    pub fn queue_request(
        &self,
        points: Arc<RTree<PointFeature>>,
        bbox: BBox,
        zoom: i32,
        radius_px: f64,
        tile_quality: f64,
    ) -> Uuid {
        let id = Uuid::new_v4();
        *self.latest.lock().unwrap() = id;
        self.pending.lock().unwrap().push(ClusterRequest {
            id,
            points,
            bbox,
            zoom,
            radius_px,
            tile_quality,
        });
        id
    }

    pub fn is_latest(&self, id: Uuid) -> bool {
        *self.latest.lock().unwrap() == id
    }
}

pub fn process_requests(mut commands: Commands, worker: Res<ClusterWorker>) {
    let task_pool = AsyncComputeTaskPool::get();
    let active_tasks = worker.active_tasks.clone();

    let can_process = {
        let active = *active_tasks.lock().unwrap();
        active < worker.max_concurrent
    };
    if !can_process {
        return;
    }

    let maybe_request = {
        let mut requests = worker.pending.lock().unwrap();
        // Only the newest queued request is worth computing.
        let request = requests.pop();
        requests.clear();
        request
    };

    if let Some(request) = maybe_request {
        {
            let mut active = active_tasks.lock().unwrap();
            *active += 1;
        }

        let latest = worker.latest.clone();
        let tx = worker.tx.clone();
        let active_tasks_clone = active_tasks.clone();
        let task = task_pool.spawn(async move {
            let result = build_clusters(
                &request.points,
                request.bbox,
                request.zoom,
                request.radius_px,
                request.tile_quality,
            );
            if *latest.lock().unwrap() == request.id {
                let _ = tx.send((request.id, result));
            }

            let mut active = active_tasks_clone.lock().unwrap();
            *active -= 1;
        });

        commands.spawn(TaskComponent(task));
    }
}

#[derive(Component)]
struct TaskComponent(Task<()>);

fn cleanup_tasks(mut commands: Commands, mut tasks: Query<(Entity, &mut TaskComponent)>) {
    for (entity, mut task) in tasks.iter_mut() {
        if future::block_on(future::poll_once(&mut task.0)).is_some() {
            commands.entity(entity).despawn();
        }
    }
}

pub fn apply_cluster_results(
    receiver: Option<Res<ClusterReceiver>>,
    worker: Res<ClusterWorker>,
    mut collection: ResMut<PointCollection>,
) {
    if let Some(receiver) = receiver {
        if let Ok((id, features)) = receiver.try_recv() {
            if worker.is_latest(id) {
                info!("cluster refresh applied: {} features", features.len());
                collection.replace(features);
            } else {
                info!("cluster refresh {id} superseded, dropping result");
            }
        }
    }
}

pub struct ClusterWorkerPlugin;

impl Plugin for ClusterWorkerPlugin {
    fn build(&self, app: &mut App) {
        let (tx, rx) = bounded(8);
        app.insert_resource(ClusterWorker::new(3, tx))
            .insert_resource(ClusterReceiver(rx))
            .add_systems(Update, (process_requests, cleanup_tasks))
            .add_systems(FixedUpdate, apply_cluster_results);
    }
}
