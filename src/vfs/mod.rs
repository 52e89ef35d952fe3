//! The virtual filesystem core.
//!
//! One [`McrawFileSystem`] projects a single container: it builds the
//! entry list at mount, serves directory/lookup queries from it, answers
//! audio reads from the prebuilt blob and routes DNG reads through the
//! cache and the two worker pools. The host adapter drives it; all
//! blocking happens in the pools or in the cache's bounded wait, never on
//! the adapter's dispatch path when the adapter supports deferred
//! completion.

mod entries;

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::{debug, error, info};

use crate::audio::synthesize_audio;
use crate::cache::{ContentCache, DEFAULT_WAIT_TIMEOUT};
use crate::container::{CameraConfiguration, FrameMetadata};
use crate::dng::{render_dng, RenderRequest};
use crate::entry::{Entry, Timestamp};
use crate::error::VfsError;
use crate::options::{effective_scale, RenderOptions};
use crate::pool::{DecoderPool, WorkerPool};
use crate::timing::frame_rate_from_timestamps;
use crate::vfs::entries::build_frame_entries;

/// Name of the optional platform-shell sidecar entry.
pub const SHELL_SIDECAR_NAME: &str = "desktop.ini";

/// Contents of the shell sidecar; disables icon previews on hosts that
/// honor it.
const SHELL_SIDECAR: &str = "[.ShellClassInfo]\r\n\
ConfirmFileOp=0\r\n\
\r\n\
[ViewState]\r\n\
Mode=4\r\n\
Vid={137E7700-3573-11CF-AE69-08002B2E1262}\r\n\
FolderType=Generic\r\n\
\r\n\
[{5984FFE0-28D4-11CF-AE66-08002B2E1262}]\r\n\
Mode=4\r\n\
LogicalViewMode=1\r\n\
IconSize=16\r\n\
\r\n\
[LocalizedFileNames]\r\n";

/// Name of the projected audio file.
pub const AUDIO_FILE_NAME: &str = "audio.wav";

/// Summary of a mounted recording.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FileInfo {
    pub fps: f64,
    pub total_frames: u32,
    pub dropped_frames: u32,
    pub width: u32,
    pub height: u32,
}

/// Per-mount configuration.
#[derive(Debug, Clone)]
pub struct MountConfig {
    pub options: RenderOptions,
    /// Spatial downscale applied when DRAFT is set; one of {1, 2, 4, 8}.
    pub draft_scale: u32,
    /// Overrides the DNG UniqueCameraModel when non-empty.
    pub custom_camera_model: Option<String>,
    /// Project the platform-shell sidecar entry.
    pub shell_entries: bool,
    /// Bounded wait on an in-progress cache peer.
    pub wait_timeout: Duration,
}

impl Default for MountConfig {
    fn default() -> Self {
        Self {
            options: RenderOptions::NONE,
            draft_scale: 2,
            custom_camera_model: None,
            shell_entries: false,
            wait_timeout: DEFAULT_WAIT_TIMEOUT,
        }
    }
}

/// Receives the outcome of a read: the copied bytes or the surfaced error.
///
/// Invoked exactly once for every read that enters the DNG or audio path,
/// on the reading thread for cache hits and synchronous completions, or on
/// a processing worker for deferred ones.
pub type ReadCompletion = Box<dyn FnOnce(Result<Vec<u8>, VfsError>) + Send + 'static>;

struct MountState {
    options: RenderOptions,
    draft_scale: u32,
    custom_camera_model: Option<String>,
    entries: Vec<Entry>,
    audio_blob: Arc<Vec<u8>>,
    typical_dng_size: u64,
    fps: f64,
    width: u32,
    height: u32,
    total_frames: u32,
    dropped_frames: u32,
}

/// What the I/O pool hands to the processing pool for one frame.
struct DecodedFrame {
    index: usize,
    config: CameraConfiguration,
    metadata: FrameMetadata,
    pixels: Vec<u16>,
}

/// Virtual filesystem over one mounted container.
pub struct McrawFileSystem {
    src_path: PathBuf,
    base_name: String,
    shell_entries: bool,
    wait_timeout: Duration,
    io_pool: Arc<WorkerPool>,
    processing_pool: Arc<WorkerPool>,
    cache: Arc<ContentCache>,
    decoders: Arc<DecoderPool>,
    /// Cleared on teardown; queued renders then skip the cache write.
    open: Arc<AtomicBool>,
    state: Mutex<MountState>,
}

impl McrawFileSystem {
    /// Open `src_path` and build the projected entry list.
    pub fn new(
        src_path: &Path,
        io_pool: Arc<WorkerPool>,
        processing_pool: Arc<WorkerPool>,
        cache: Arc<ContentCache>,
        decoders: Arc<DecoderPool>,
        config: MountConfig,
    ) -> Result<Self, VfsError> {
        let base_name = src_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "frame".to_string());

        let fs = Self {
            src_path: src_path.to_path_buf(),
            base_name,
            shell_entries: config.shell_entries,
            wait_timeout: config.wait_timeout,
            io_pool,
            processing_pool,
            cache,
            decoders,
            open: Arc::new(AtomicBool::new(true)),
            state: Mutex::new(MountState {
                options: config.options,
                draft_scale: config.draft_scale,
                custom_camera_model: None,
                entries: Vec::new(),
                audio_blob: Arc::new(Vec::new()),
                typical_dng_size: 0,
                fps: 0.0,
                width: 0,
                height: 0,
                total_frames: 0,
                dropped_frames: 0,
            }),
        };

        let built = fs.build_state(
            config.options,
            config.draft_scale,
            config.custom_camera_model,
        )?;
        *fs.state.lock().unwrap() = built;

        Ok(fs)
    }

    /// Rebuild the full mount state from the container.
    fn build_state(
        &self,
        options: RenderOptions,
        draft_scale: u32,
        custom_camera_model: Option<String>,
    ) -> Result<MountState, VfsError> {
        debug!(options = %options, draft_scale, "building entries for {}", self.src_path.display());

        let base_name = self.base_name.clone();
        let shell_entries = self.shell_entries;
        let model = custom_camera_model.clone();

        let state = self.decoders.with_decoder(&self.src_path, move |decoder| {
            let mut timestamps = decoder.frame_timestamps()?;
            timestamps.sort_unstable();

            if timestamps.is_empty() {
                return Ok(MountState {
                    options,
                    draft_scale,
                    custom_camera_model: model,
                    entries: Vec::new(),
                    audio_blob: Arc::new(Vec::new()),
                    typical_dng_size: 0,
                    fps: 0.0,
                    width: 0,
                    height: 0,
                    total_frames: 0,
                    dropped_frames: 0,
                });
            }

            let fps = frame_rate_from_timestamps(&timestamps);

            let first = decoder.load_frame(timestamps[0])?;
            let config = CameraConfiguration::parse(&decoder.container_metadata()?)?;
            let metadata = FrameMetadata::parse(&first.metadata)?;

            // One render up front measures the size declared for every
            // frame entry.
            let request = RenderRequest {
                fps,
                frame_number: 0,
                options,
                scale: effective_scale(options, draft_scale),
                camera_model_override: model.as_deref(),
            };
            let typical_dng_size = render_dng(&first.pixels, &metadata, &config, &request)?.len() as u64;

            let mut entries = Vec::new();

            if shell_entries {
                entries.push(Entry::file(SHELL_SIDECAR_NAME, SHELL_SIDECAR.len() as u64));
            }

            let audio_chunks = decoder.load_audio()?;
            let audio_blob = if audio_chunks.is_empty() {
                Vec::new()
            } else {
                synthesize_audio(
                    audio_chunks,
                    timestamps[0],
                    decoder.audio_channels(),
                    decoder.audio_sample_rate_hz(),
                    fps,
                )?
            };

            if !audio_blob.is_empty() {
                entries.push(Entry::file(AUDIO_FILE_NAME, audio_blob.len() as u64));
            }

            let frames = build_frame_entries(&timestamps, fps, &base_name, typical_dng_size);
            entries.extend(frames.entries);

            Ok(MountState {
                options,
                draft_scale,
                custom_camera_model: model,
                entries,
                audio_blob: Arc::new(audio_blob),
                typical_dng_size,
                fps,
                width: metadata.width,
                height: metadata.height,
                total_frames: timestamps.len() as u32,
                dropped_frames: frames.dropped_frames,
            })
        })?;

        info!(
            entries = state.entries.len(),
            fps = state.fps,
            dropped = state.dropped_frames,
            "mounted {}",
            self.src_path.display()
        );

        Ok(state)
    }

    /// The current entry list. The filter is a hint and is applied by the
    /// host adapter if it needs one.
    pub fn list_files(&self, _filter: &str) -> Vec<Entry> {
        self.state.lock().unwrap().entries.clone()
    }

    /// Resolve an absolute (mount-rooted) path to its entry.
    pub fn find_entry(&self, path: &Path) -> Option<Entry> {
        let relative: PathBuf = path
            .components()
            .filter(|c| matches!(c, std::path::Component::Normal(_)))
            .collect();

        let state = self.state.lock().unwrap();
        state
            .entries
            .iter()
            .find(|e| e.full_path() == relative)
            .cloned()
    }

    /// Serve a range read of `entry`.
    ///
    /// Sidecar and audio reads complete synchronously regardless of
    /// `async_read`. DNG reads complete synchronously on a cache hit;
    /// otherwise the frame is decoded on the I/O pool and rendered on the
    /// processing pool. With `async_read` the call returns 0 immediately
    /// and the completion delivers the bytes; without it the call blocks
    /// on the render and returns the copied length.
    pub fn read_file(
        &self,
        entry: &Entry,
        pos: u64,
        len: usize,
        completion: ReadCompletion,
        async_read: bool,
    ) -> Result<usize, VfsError> {
        if self.shell_entries && entry.name == SHELL_SIDECAR_NAME {
            let chunk = slice_range(SHELL_SIDECAR.as_bytes(), pos, len);
            let copied = chunk.len();
            completion(Ok(chunk));
            return Ok(copied);
        }

        if entry.has_extension("wav") {
            let blob = self.state.lock().unwrap().audio_blob.clone();
            let chunk = slice_range(&blob, pos, len);
            let copied = chunk.len();
            completion(Ok(chunk));
            return Ok(copied);
        }

        if entry.has_extension("dng") {
            return self.read_frame(entry, pos, len, completion, async_read);
        }

        Err(VfsError::NotFound(format!(
            "no readable entry named {:?}",
            entry.name
        )))
    }

    /// The DNG read path: cache lookup, then decode + render on the pools.
    fn read_frame(
        &self,
        entry: &Entry,
        pos: u64,
        len: usize,
        completion: ReadCompletion,
        async_read: bool,
    ) -> Result<usize, VfsError> {
        if let Some(item) = self.cache.get(entry, self.wait_timeout) {
            let chunk = slice_range(&item, pos, len);
            // Re-put the same item to refresh its recency.
            self.cache.put(entry, item);
            let copied = chunk.len();
            completion(Ok(chunk));
            return Ok(copied);
        }

        // Miss: this call now owns the build obligation for the entry.
        let (fps, options, scale, model) = {
            let state = self.state.lock().unwrap();
            (
                state.fps,
                state.options,
                effective_scale(state.options, state.draft_scale),
                state.custom_camera_model.clone(),
            )
        };

        let timestamp: Timestamp = entry.user_data;
        let src_path = self.src_path.clone();
        let decoders = Arc::clone(&self.decoders);
        let options_for_log = options;

        let decode = self.io_pool.submit(move || -> Result<DecodedFrame, VfsError> {
            debug!(timestamp, options = %options_for_log, "decoding frame");

            decoders.with_decoder(&src_path, |decoder| {
                let frames = decoder.frame_timestamps()?;
                let index = frames
                    .iter()
                    .position(|&t| t == timestamp)
                    .ok_or_else(|| VfsError::NotFound(format!("frame {timestamp} not found")))?;

                let raw = decoder.load_frame(timestamp)?;
                let config = CameraConfiguration::parse(&decoder.container_metadata()?)?;
                let metadata = FrameMetadata::parse(&raw.metadata)?;

                Ok(DecodedFrame {
                    index,
                    config,
                    metadata,
                    pixels: raw.pixels,
                })
            })
        });

        let cache = Arc::clone(&self.cache);
        let open = Arc::clone(&self.open);
        let task_entry = entry.clone();

        let render = self.processing_pool.submit(move || -> usize {
            let outcome = (|| -> Result<Vec<u8>, VfsError> {
                let frame = decode.wait()??;

                debug!(entry = %task_entry.name, "generating DNG");

                let request = RenderRequest {
                    fps,
                    frame_number: frame.index as i64,
                    options,
                    scale,
                    camera_model_override: model.as_deref(),
                };
                let dng = Arc::new(render_dng(
                    &frame.pixels,
                    &frame.metadata,
                    &frame.config,
                    &request,
                )?);

                if !open.load(Ordering::Acquire) {
                    // The mount went away while we rendered; release the
                    // build obligation without publishing anything.
                    return Err(VfsError::Io("mount closed during render".to_string()));
                }

                cache.put(&task_entry, Arc::clone(&dng));
                Ok(slice_range(&dng, pos, len))
            })();

            match outcome {
                Ok(chunk) => {
                    let copied = chunk.len();
                    completion(Ok(chunk));
                    copied
                }
                Err(err) => {
                    error!(entry = %task_entry.name, "failed to generate DNG: {err}");
                    cache.mark_load_failed(&task_entry);
                    completion(Err(err.surface()));
                    0
                }
            }
        });

        if async_read {
            return Ok(0);
        }

        render.wait()
    }

    /// Apply new options and rebuild the entry list.
    ///
    /// Entry identities are stable across the rebuild; only sizes and
    /// timestamps may change. On failure the previous state is kept.
    pub fn update_options(
        &self,
        options: RenderOptions,
        draft_scale: u32,
        custom_camera_model: Option<String>,
    ) -> Result<(), VfsError> {
        let rebuilt = self.build_state(options, draft_scale, custom_camera_model)?;
        *self.state.lock().unwrap() = rebuilt;
        Ok(())
    }

    /// Recording summary for the host UI.
    pub fn file_info(&self) -> FileInfo {
        let state = self.state.lock().unwrap();
        FileInfo {
            fps: state.fps,
            total_frames: state.total_frames,
            dropped_frames: state.dropped_frames,
            width: state.width,
            height: state.height,
        }
    }

    /// Declared size shared by every frame entry.
    pub fn typical_dng_size(&self) -> u64 {
        self.state.lock().unwrap().typical_dng_size
    }

    /// The mounted container path.
    pub fn source_path(&self) -> &Path {
        &self.src_path
    }

    /// Stop accepting cache writes from in-flight renders and drop this
    /// source's pooled decoders. Reads already queued run to completion
    /// into discarded targets.
    pub fn close(&self) {
        if self.open.swap(false, Ordering::AcqRel) {
            info!("closing mount for {}", self.src_path.display());
            self.decoders.evict_source(&self.src_path);
        }
    }
}

impl Drop for McrawFileSystem {
    fn drop(&mut self) {
        self.close();
    }
}

fn slice_range(data: &[u8], pos: u64, len: usize) -> Vec<u8> {
    if pos >= data.len() as u64 {
        return Vec::new();
    }
    let start = pos as usize;
    let end = (start + len).min(data.len());
    data[start..end].to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::testing::UniformClipFactory;
    use crate::container::AudioChunk;
    use std::sync::atomic::AtomicUsize;
    use std::sync::mpsc;

    struct Fixture {
        fs: McrawFileSystem,
        loads: Arc<AtomicUsize>,
    }

    fn fixture(timestamps: Vec<Timestamp>, audio: Vec<AudioChunk>, config: MountConfig) -> Fixture {
        let mut factory = UniformClipFactory::new(timestamps);
        factory.audio = audio;
        let loads = Arc::clone(&factory.loads);
        let factory = Arc::new(factory);

        let fs = McrawFileSystem::new(
            Path::new("/clips/take1.mcraw"),
            Arc::new(WorkerPool::new("io", 2).unwrap()),
            Arc::new(WorkerPool::new("proc", 2).unwrap()),
            Arc::new(ContentCache::new(64 * 1024 * 1024)),
            Arc::new(DecoderPool::new(factory)),
            config,
        )
        .unwrap();

        Fixture { fs, loads }
    }

    fn regular_timestamps(count: i64) -> Vec<Timestamp> {
        (0..count).map(|i| i * 33_333_333).collect()
    }

    fn read_sync(fs: &McrawFileSystem, entry: &Entry, pos: u64, len: usize) -> Vec<u8> {
        let (tx, rx) = mpsc::channel();
        let copied = fs
            .read_file(
                entry,
                pos,
                len,
                Box::new(move |result| {
                    let _ = tx.send(result);
                }),
                false,
            )
            .unwrap();
        let data = rx.recv().unwrap().unwrap();
        assert_eq!(copied, data.len());
        data
    }

    #[test]
    fn test_mount_builds_frame_entries() {
        let fx = fixture(regular_timestamps(5), Vec::new(), MountConfig::default());
        let entries = fx.fs.list_files("/");

        assert_eq!(entries.len(), 5);
        assert_eq!(entries[0].name, "take1-0000000.dng");
        assert_eq!(entries[4].name, "take1-0000004.dng");
        assert!(entries.iter().all(|e| e.size > 0));
    }

    #[test]
    fn test_all_entries_share_declared_size() {
        let fx = fixture(regular_timestamps(5), Vec::new(), MountConfig::default());
        let typical = fx.fs.typical_dng_size();

        assert!(typical > 0);
        for entry in fx.fs.list_files("") {
            assert_eq!(entry.size, typical);
        }
    }

    #[test]
    fn test_mount_with_audio_adds_wav_entry() {
        let audio = vec![(0i64, vec![3i16; 4800])];
        let fx = fixture(regular_timestamps(3), audio, MountConfig::default());

        let entries = fx.fs.list_files("");
        assert_eq!(entries.len(), 4);
        assert_eq!(entries[0].name, AUDIO_FILE_NAME);
        assert!(entries[0].size > 4800 * 2);
    }

    #[test]
    fn test_empty_container_mounts_with_no_entries() {
        let fx = fixture(Vec::new(), Vec::new(), MountConfig::default());

        assert!(fx.fs.list_files("").is_empty());
        let info = fx.fs.file_info();
        assert_eq!(info.total_frames, 0);
        assert_eq!(info.fps, 0.0);
    }

    #[test]
    fn test_find_entry_by_absolute_path() {
        let fx = fixture(regular_timestamps(2), Vec::new(), MountConfig::default());

        let found = fx.fs.find_entry(Path::new("/take1-0000001.dng")).unwrap();
        assert_eq!(found.name, "take1-0000001.dng");

        assert!(fx.fs.find_entry(Path::new("/missing.dng")).is_none());
    }

    #[test]
    fn test_file_info() {
        let fx = fixture(regular_timestamps(10), Vec::new(), MountConfig::default());
        let info = fx.fs.file_info();

        assert_eq!(info.total_frames, 10);
        assert_eq!(info.dropped_frames, 0);
        assert_eq!(info.width, 8);
        assert_eq!(info.height, 8);
        assert!((info.fps - 30.0).abs() < 0.1);
    }

    #[test]
    fn test_read_dng_returns_tiff_stream() {
        let fx = fixture(regular_timestamps(3), Vec::new(), MountConfig::default());
        let entry = fx.fs.find_entry(Path::new("/take1-0000001.dng")).unwrap();

        let head = read_sync(&fx.fs, &entry, 0, 8);
        assert_eq!(&head[0..4], &[0x49, 0x49, 0x2A, 0x00]);
    }

    #[test]
    fn test_read_dng_is_cached() {
        let fx = fixture(regular_timestamps(3), Vec::new(), MountConfig::default());
        let entry = fx.fs.find_entry(Path::new("/take1-0000002.dng")).unwrap();

        let loads_after_mount = fx.loads.load(Ordering::SeqCst);
        read_sync(&fx.fs, &entry, 0, 64);
        read_sync(&fx.fs, &entry, 0, 64);
        read_sync(&fx.fs, &entry, 64, 64);

        // Only the first read decodes; the rest hit the cache.
        assert_eq!(fx.loads.load(Ordering::SeqCst), loads_after_mount + 1);
    }

    #[test]
    fn test_read_past_end_returns_empty() {
        let fx = fixture(regular_timestamps(2), Vec::new(), MountConfig::default());
        let entry = fx.fs.find_entry(Path::new("/take1-0000000.dng")).unwrap();

        let data = read_sync(&fx.fs, &entry, 100_000_000, 64);
        assert!(data.is_empty());
    }

    #[test]
    fn test_read_wav_serves_blob() {
        let audio = vec![(0i64, vec![7i16; 480])];
        let fx = fixture(regular_timestamps(2), audio, MountConfig::default());
        let entry = fx.fs.find_entry(Path::new(&format!("/{AUDIO_FILE_NAME}"))).unwrap();

        let head = read_sync(&fx.fs, &entry, 0, 4);
        assert_eq!(&head, b"RIFF");

        let tail = read_sync(&fx.fs, &entry, entry.size - 2, 100);
        assert_eq!(tail.len(), 2);
    }

    #[test]
    fn test_shell_sidecar_read() {
        let config = MountConfig {
            shell_entries: true,
            ..MountConfig::default()
        };
        let fx = fixture(regular_timestamps(2), Vec::new(), config);

        let entries = fx.fs.list_files("");
        assert_eq!(entries[0].name, SHELL_SIDECAR_NAME);

        let data = read_sync(&fx.fs, &entries[0], 0, 16);
        assert_eq!(&data, b"[.ShellClassInfo");
    }

    #[test]
    fn test_read_unknown_entry_kind_rejected() {
        let fx = fixture(regular_timestamps(2), Vec::new(), MountConfig::default());
        let bogus = Entry::file("notes.txt", 10);

        let result = fx.fs.read_file(&bogus, 0, 10, Box::new(|_| {}), false);
        assert!(matches!(result, Err(VfsError::NotFound(_))));
    }

    #[test]
    fn test_async_read_returns_zero_and_completes() {
        let fx = fixture(regular_timestamps(2), Vec::new(), MountConfig::default());
        let entry = fx.fs.find_entry(Path::new("/take1-0000000.dng")).unwrap();

        let (tx, rx) = mpsc::channel();
        let returned = fx
            .fs
            .read_file(
                &entry,
                0,
                8,
                Box::new(move |result| {
                    let _ = tx.send(result);
                }),
                true,
            )
            .unwrap();

        assert_eq!(returned, 0);
        let data = rx
            .recv_timeout(Duration::from_secs(5))
            .unwrap()
            .unwrap();
        assert_eq!(&data[0..4], &[0x49, 0x49, 0x2A, 0x00]);
    }

    #[test]
    fn test_update_options_rebuilds_with_stable_identity() {
        let fx = fixture(regular_timestamps(4), Vec::new(), MountConfig::default());
        let before = fx.fs.list_files("");
        let size_before = fx.fs.typical_dng_size();

        fx.fs
            .update_options(RenderOptions::DRAFT, 2, None)
            .unwrap();

        let after = fx.fs.list_files("");
        assert_eq!(before, after, "entry identity is structural");
        assert!(
            fx.fs.typical_dng_size() < size_before,
            "draft renders smaller frames"
        );
    }

    #[test]
    fn test_closed_mount_skips_cache_write() {
        let fx = fixture(regular_timestamps(2), Vec::new(), MountConfig::default());
        let entry = fx.fs.find_entry(Path::new("/take1-0000001.dng")).unwrap();

        fx.fs.close();

        let (tx, rx) = mpsc::channel();
        let result = fx.fs.read_file(
            &entry,
            0,
            8,
            Box::new(move |result| {
                let _ = tx.send(result);
            }),
            false,
        );

        // The read completes with an error and nothing is published.
        assert_eq!(result.unwrap(), 0);
        assert!(rx.recv().unwrap().is_err());
    }

    #[test]
    fn test_concurrent_reads_render_once() {
        let fx = Arc::new(fixture(
            regular_timestamps(3),
            Vec::new(),
            MountConfig::default(),
        ));
        let entry = fx.fs.find_entry(Path::new("/take1-0000001.dng")).unwrap();
        let loads_after_mount = fx.loads.load(Ordering::SeqCst);

        let readers: Vec<_> = (0..10)
            .map(|_| {
                let fx = Arc::clone(&fx);
                let entry = entry.clone();
                std::thread::spawn(move || read_sync(&fx.fs, &entry, 0, 128))
            })
            .collect();

        let results: Vec<Vec<u8>> = readers.into_iter().map(|r| r.join().unwrap()).collect();

        // All ten readers observed identical bytes from a single render.
        assert_eq!(fx.loads.load(Ordering::SeqCst), loads_after_mount + 1);
        for window in results.windows(2) {
            assert_eq!(window[0], window[1]);
        }
    }
}
