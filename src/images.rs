//! Icon image loading.
//!
//! Loads are started together and settle independently. A shared counter
//! fires the completion callback once every requested icon has been
//! registered, skipped or has failed. Failures are logged, never raised.

use crate::error::MapError;
use crate::map::MapHandle;
use crate::types::IconDictionary;
use std::cell::RefCell;
use std::future::Future;
use std::rc::Rc;

/// Outcome of a [`load_images_to_map`] call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageLoadSummary {
    /// Icons fetched and registered by this call.
    pub loaded: usize,
    /// Icons that were already registered on the map.
    pub skipped: usize,
    /// One [`MapError::ImageLoad`] per icon that could not be loaded or
    /// registered.
    pub failed: Vec<MapError>,
}

impl ImageLoadSummary {
    pub fn total(&self) -> usize {
        self.loaded + self.skipped + self.failed.len()
    }

    pub fn failed_names(&self) -> Vec<&str> {
        self.failed
            .iter()
            .filter_map(|e| match e {
                MapError::ImageLoad { name, .. } => Some(name.as_str()),
                _ => None,
            })
            .collect()
    }
}

fn image_load_error(name: &str, cause: MapError) -> MapError {
    let message = match cause {
        MapError::Js(message) => message,
        other => other.to_string(),
    };
    MapError::ImageLoad {
        name: name.to_string(),
        message,
    }
}

/// Counts settled loads and fires the callback on the last one.
struct CompletionCounter {
    expected: usize,
    summary: RefCell<ImageLoadSummary>,
    on_complete: RefCell<Option<Box<dyn FnOnce(ImageLoadSummary)>>>,
}

impl CompletionCounter {
    fn new(expected: usize, on_complete: Box<dyn FnOnce(ImageLoadSummary)>) -> Self {
        Self {
            expected,
            summary: RefCell::new(ImageLoadSummary::default()),
            on_complete: RefCell::new(Some(on_complete)),
        }
    }

    fn record(&self, update: impl FnOnce(&mut ImageLoadSummary)) {
        let done = {
            let mut summary = self.summary.borrow_mut();
            update(&mut *summary);
            summary.total() == self.expected
        };
        if !done {
            return;
        }
        let callback = self.on_complete.borrow_mut().take();
        if let Some(callback) = callback {
            let summary = self.summary.borrow().clone();
            callback(summary);
        }
    }
}

/// Loads every icon of `images` into `map` and calls `on_complete` once all
/// of them have settled. Icons already present on the map are not reloaded.
///
/// An empty dictionary completes immediately.
pub fn load_images_to_map_with<M: MapHandle>(
    map: &M,
    images: &IconDictionary,
    on_complete: impl FnOnce(ImageLoadSummary) + 'static,
) {
    if images.is_empty() {
        on_complete(ImageLoadSummary::default());
        return;
    }

    let counter = Rc::new(CompletionCounter::new(images.len(), Box::new(on_complete)));

    for (name, entry) in images {
        if map.has_image(name) {
            counter.record(|s| s.skipped += 1);
            continue;
        }

        let counter = counter.clone();
        let target = map.clone();
        let name = name.clone();
        let sdf = entry.dynamic_color;
        let path = entry.path.clone();

        map.load_image(
            &entry.path,
            Box::new(move |result: Result<M::Image, MapError>| {
                let image = match result {
                    Ok(image) => image,
                    Err(e) => {
                        let error = image_load_error(&name, e);
                        log::error!("{} (path {})", error, path);
                        counter.record(|s| s.failed.push(error));
                        return;
                    }
                };

                // Another call may have registered the same name meanwhile.
                if target.has_image(&name) {
                    counter.record(|s| s.skipped += 1);
                    return;
                }

                match target.add_image(&name, image, sdf) {
                    Ok(()) => {
                        log::debug!("Registered icon {} (sdf: {})", name, sdf);
                        counter.record(|s| s.loaded += 1);
                    }
                    Err(e) => {
                        let error = image_load_error(&name, e);
                        log::error!("{}", error);
                        counter.record(|s| s.failed.push(error));
                    }
                }
            }),
        );
    }
}

/// Future form of [`load_images_to_map_with`].
///
/// Loading starts immediately; the returned future only waits for it.
/// Resolves to `None` if the map dropped a pending load without settling it.
pub fn load_images_to_map<M: MapHandle>(
    map: &M,
    images: &IconDictionary,
) -> impl Future<Output = Option<ImageLoadSummary>> + 'static {
    let (tx, rx) = futures_channel::oneshot::channel::<ImageLoadSummary>();
    load_images_to_map_with(map, images, move |summary| {
        let _ = tx.send(summary);
    });

    async move {
        match rx.await {
            Ok(summary) => Some(summary),
            Err(_) => {
                log::warn!("Icon loading was abandoned before every load settled");
                None
            }
        }
    }
}
