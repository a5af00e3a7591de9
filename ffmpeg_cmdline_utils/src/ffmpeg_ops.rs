use std::{
    ffi::OsStr,
    io::prelude::*,
    path::{Path, PathBuf},
    process::{Child, Command, Stdio},
    time::{Duration, Instant},
};

#[cfg(target_family = "windows")]
use std::os::windows::process::CommandExt;

use crossbeam_channel::{Receiver, RecvTimeoutError};
use image::RgbImage;
use log::{debug, trace, warn};
use wait_timeout::ChildExt;
use FfmpegCommandName::*;
use FfmpegError::*;

use crate::*;

const FFPROBE_TIMEOUT: Duration = Duration::from_secs(60);

// Attempt to prevent OOM on very implausible resolutions.
const MAX_FRAME_BYTES: usize = 5 * 1024 * 1024 * 1024;

/// Iterator over raw `rgb24` frames written to stdout by an ffmpeg child process.
///
/// Frames are read from the pipe on a separate thread, so a decoder that stalls without writing
/// anything is still interrupted when the deadline passes. Iteration ends when the requested
/// number of frames has been read, when ffmpeg closes its output, or at the deadline. The child
/// is killed and reaped when the iterator finishes or is dropped.
#[derive(Debug)]
pub struct FfmpegFrameIter {
    child: Option<Child>,
    frames: Option<Receiver<RgbImage>>,
    frames_read: u32,
    deadline: Instant,
    timed_out: bool,
}

impl FfmpegFrameIter {
    fn from_reader(
        reader: impl Read + Send + 'static,
        child: Option<Child>,
        (width, height): (u32, u32),
        max_frames: u32,
        timeout: Duration,
    ) -> Self {
        let (snd, rcv) = crossbeam_channel::bounded(1);

        std::thread::spawn(move || {
            let mut reader = reader;
            let Some(raw_buf_size) = usize::try_from(width)
                .ok()
                .and_then(|w| w.checked_mul(usize::try_from(height).ok()?))
                .and_then(|wh| wh.checked_mul(3))
                .filter(|&size| size <= MAX_FRAME_BYTES)
            else {
                return;
            };

            for _ in 0..max_frames {
                let mut raw_buf = vec![0u8; raw_buf_size];
                //something went wrong, or no more data can be read
                if reader.read_exact(&mut raw_buf).is_err() {
                    break;
                }
                let Some(frame) = RgbImage::from_raw(width, height, raw_buf) else {
                    break;
                };
                //the iterator has finished and nobody is listening
                if snd.send(frame).is_err() {
                    break;
                }
            }
        });

        Self {
            child,
            frames: Some(rcv),
            frames_read: 0,
            deadline: Instant::now().checked_add(timeout).unwrap_or_else(far_future),
            timed_out: false,
        }
    }

    /// Whether iteration stopped because the deadline passed rather than because the
    /// video ran out of frames.
    pub fn timed_out(&self) -> bool {
        self.timed_out
    }

    fn finish(&mut self) {
        //dropping the receiver releases a reader blocked on a full channel. Killing the child
        //closes the pipe under a reader blocked on ffmpeg.
        self.frames = None;
        if let Some(child) = self.child.as_mut() {
            let _kill_error = child.kill();
            let _wait_error = child.wait();
        }
    }
}

fn far_future() -> Instant {
    Instant::now() + Duration::from_secs(u64::from(u32::MAX))
}

impl Iterator for FfmpegFrameIter {
    type Item = RgbImage;

    fn next(&mut self) -> Option<Self::Item> {
        let frames = self.frames.as_ref()?;

        match frames.recv_deadline(self.deadline) {
            Ok(frame) => {
                self.frames_read += 1;
                trace!(target: "ffmpeg_frames", "read frame {}", self.frames_read);
                Some(frame)
            }
            Err(RecvTimeoutError::Disconnected) => {
                self.finish();
                None
            }
            Err(RecvTimeoutError::Timeout) => {
                warn!(target: "ffmpeg_frames", "frame read timed out after {} frames", self.frames_read);
                self.timed_out = true;
                self.finish();
                None
            }
        }
    }
}

// to prevent accumulation of zombie processes, reap the return code of
// ffmpeg subcommands (if nothing else has done so already) here
impl Drop for FfmpegFrameIter {
    fn drop(&mut self) {
        self.finish();
    }
}

/// How frames are selected from the video timeline.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub enum FrameSpacing {
    /// Every decoded frame, from the start of the video.
    #[default]
    EveryFrame,
    /// Choose a rate so that `num_frames` frames are spread across the whole duration.
    EvenlySpaced,
}

#[derive(Clone, Debug)]
pub struct FfmpegFrameReaderBuilder {
    src_path: PathBuf,
    spacing: FrameSpacing,
    num_frames: Option<u32>,
    timeout: Option<Duration>,
}

impl FfmpegFrameReaderBuilder {
    pub fn new(src_path: impl AsRef<Path>) -> Self {
        Self {
            src_path: src_path.as_ref().to_path_buf(),
            spacing: FrameSpacing::default(),
            num_frames: None,
            timeout: None,
        }
    }

    pub fn src_path(&self) -> &Path {
        &self.src_path
    }

    pub fn evenly_spaced(&mut self) -> &mut Self {
        self.spacing = FrameSpacing::EvenlySpaced;
        self
    }

    pub fn num_frames(&mut self, num_frames: u32) -> &mut Self {
        self.num_frames = Some(num_frames);
        self
    }

    pub fn timeout(&mut self, timeout: Duration) -> &mut Self {
        self.timeout = Some(timeout);
        self
    }

    /// Probe the video and start decoding it into rgb24 frames.
    ///
    /// # Errors
    /// Returns `Err` if ffprobe cannot read the file, the file has no video stream, or ffmpeg
    /// cannot be started.
    pub fn spawn_rgb(&self) -> Result<(FfmpegFrameIter, VideoInfo), FfmpegError> {
        //we need the resolution of the video so that stdout can be cut into frames.
        let stats = VideoInfo::new(&self.src_path)?;

        let (width, height) = stats.resolution();
        if width == 0 || height == 0 {
            return Err(InvalidResolution);
        }

        let fps_string = match (&self.spacing, self.num_frames) {
            (FrameSpacing::EvenlySpaced, Some(num_frames)) => {
                evenly_spaced_fps(stats.duration(), num_frames)
            }
            //without a frame count there is nothing to spread out, so return every frame.
            (FrameSpacing::EvenlySpaced, None) | (FrameSpacing::EveryFrame, _) => None,
        };

        let num_frames_string = self.num_frames.map(|n| n.to_string());

        #[rustfmt::skip]
        let mut args = vec![
            OsStr::new("-hide_banner"),
            OsStr::new("-loglevel"), OsStr::new("warning"),
            OsStr::new("-nostats"),
            OsStr::new("-threads"),  OsStr::new("1"),
            OsStr::new("-i"),        self.src_path.as_os_str(),
            OsStr::new("-an"),
            OsStr::new("-sn"),
        ];

        if let Some(fps_string) = &fps_string {
            args.extend([OsStr::new("-vf"), OsStr::new(fps_string)]);
        }

        if let Some(num_frames_string) = &num_frames_string {
            args.extend([OsStr::new("-frames:v"), OsStr::new(num_frames_string)]);
        }

        #[rustfmt::skip]
        args.extend([
            OsStr::new("-pix_fmt"),  OsStr::new("rgb24"),
            OsStr::new("-c:v"),      OsStr::new("rawvideo"),
            OsStr::new("-f"),        OsStr::new("image2pipe"),
            OsStr::new("-"),
        ]);

        debug!(target: "ffmpeg_frames", "spawning ffmpeg for {} ({}x{}, {:?}, filter: {:?})",
            self.src_path.display(), width, height, stats.duration(), fps_string
        );

        //stderr is discarded to prevent a lockup if its pipe fills up.
        let mut child = spawn_ffmpeg_command(Ffmpeg, &args, Stdio::null())?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Io("ffmpeg stdout was not captured".to_string()))?;

        let frame_iterator = FfmpegFrameIter::from_reader(
            stdout,
            Some(child),
            (width, height),
            self.num_frames.unwrap_or(u32::MAX),
            self.timeout.unwrap_or(Duration::from_secs(u64::from(u32::MAX))),
        );

        Ok((frame_iterator, stats))
    }
}

/// The argument to ffmpeg's `fps` filter that yields `num_frames` frames evenly spaced over
/// `duration`. Returns `None` when the duration is unknown, in which case every frame is read.
pub(crate) fn evenly_spaced_fps(duration: Duration, num_frames: u32) -> Option<String> {
    if duration.is_zero() || num_frames == 0 {
        return None;
    }

    // When using the true video length, ffmpeg sometimes returns one frame too few.
    // Assume the video is slightly shorter than reported by ffprobe (but never negative).
    let adjusted_duration = (duration.as_secs_f64() - 1.0).max(0.1);

    let seconds_per_frame = adjusted_duration / f64::from(num_frames);
    let millis_per_frame = (seconds_per_frame * 1000.0).floor().max(1.0) as u64;
    Some(format!("fps=1000/{millis_per_frame}"))
}

pub(crate) fn get_video_stats<P: AsRef<Path>>(src_path: P) -> Result<String, FfmpegError> {
    let args = &[
        OsStr::new("-v"),
        OsStr::new("quiet"),
        OsStr::new("-show_format"),
        OsStr::new("-show_streams"),
        OsStr::new("-print_format"),
        OsStr::new("json"),
        OsStr::new(src_path.as_ref()),
    ];

    let stdout = run_ffmpeg_command(Ffprobe, args, FFPROBE_TIMEOUT)?.stdout;

    String::from_utf8(stdout).map_err(|_| Utf8Conversion)
}

pub fn ffmpeg_and_ffprobe_are_callable() -> bool {
    let version = [OsStr::new("-version")];
    run_ffmpeg_command(Ffprobe, &version, FFPROBE_TIMEOUT).is_ok()
        && run_ffmpeg_command(Ffmpeg, &version, FFPROBE_TIMEOUT).is_ok()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FfmpegCommandName {
    Ffprobe,
    Ffmpeg,
}

impl FfmpegCommandName {
    pub fn as_os_str(&self) -> &'static OsStr {
        match self {
            Self::Ffprobe => OsStr::new("ffprobe"),
            Self::Ffmpeg => OsStr::new("ffmpeg"),
        }
    }
}

fn spawn_ffmpeg_command(
    name: FfmpegCommandName,
    args: &[&OsStr],
    stderr_cfg: Stdio,
) -> Result<Child, FfmpegError> {
    let mut command = Command::new(name.as_os_str());
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(stderr_cfg);

    //do not spawn a command window on windows when when in a gui application
    #[cfg(target_family = "windows")]
    command.creation_flags(winapi::um::winbase::CREATE_NO_WINDOW);

    command.spawn().map_err(|e| match e.kind() {
        //by far the most likely cause of NotFound is that ffmpeg is not installed.
        std::io::ErrorKind::NotFound => FfmpegNotFound,
        _ => Io(format!("{:?}", e.kind())),
    })
}

struct FfmpegOutput {
    stdout: Vec<u8>,
}

fn run_ffmpeg_command(
    name: FfmpegCommandName,
    args: &[&OsStr],
    timeout: Duration,
) -> Result<FfmpegOutput, FfmpegError> {
    fn read_all(pipe: Option<impl Read>) -> Vec<u8> {
        let mut acc = vec![];
        if let Some(mut pipe) = pipe {
            let _read_error = pipe.read_to_end(&mut acc);
        }
        acc
    }

    let mut child = spawn_ffmpeg_command(name, args, Stdio::piped())?;

    // Drain both pipes on their own threads so a chatty child can never block on a full pipe
    // while we wait for it to exit.
    let stdout = child.stdout.take();
    let stderr = child.stderr.take();
    let stdout_reader = std::thread::spawn(move || read_all(stdout));
    let stderr_reader = std::thread::spawn(move || read_all(stderr));

    let exit_status = child.wait_timeout(timeout);
    if !matches!(exit_status, Ok(Some(_))) {
        let _kill_error = child.kill();
        let _wait_error = child.wait();
    }

    let stdout = stdout_reader.join().unwrap_or_default();
    let stderr = stderr_reader.join().unwrap_or_default();

    match exit_status {
        Err(e) => Err(Io(format!("{:?}", e.kind()))),
        Ok(None) => Err(Timeout(timeout.as_secs())),
        Ok(Some(status)) if status.success() => Ok(FfmpegOutput { stdout }),
        //sometimes ffmpeg creates very long error messages. Limit them to the first 500 characters
        Ok(Some(_status)) => match std::str::from_utf8(&stderr) {
            Ok(error_text) => Err(FfmpegInternal(error_text.chars().take(500).collect())),
            Err(_) => Err(Utf8Conversion),
        },
    }
}

#[cfg(test)]
mod test {
    use std::io::Cursor;

    use super::*;

    //a decoder that never writes anything.
    struct StalledPipe;

    impl Read for StalledPipe {
        fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
            std::thread::sleep(Duration::from_secs(5));
            Ok(0)
        }
    }

    #[test]
    fn test_frames_are_cut_from_the_pipe() {
        let raw = (0..2 * 4 * 2 * 3).map(|x| x as u8).collect::<Vec<_>>();
        let mut iter =
            FfmpegFrameIter::from_reader(Cursor::new(raw), None, (4, 2), 10, Duration::from_secs(10));

        let frames = iter.by_ref().collect::<Vec<_>>();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[1].get_pixel(0, 0).0, [24, 25, 26]);
        assert!(!iter.timed_out());
    }

    #[test]
    fn test_max_frames_stops_the_reader() {
        let raw = vec![0u8; 5 * 2 * 2 * 3];
        let iter =
            FfmpegFrameIter::from_reader(Cursor::new(raw), None, (2, 2), 3, Duration::from_secs(10));
        assert_eq!(iter.count(), 3);
    }

    #[test]
    fn test_stalled_decoder_times_out() {
        let start = Instant::now();
        let mut iter =
            FfmpegFrameIter::from_reader(StalledPipe, None, (2, 2), 10, Duration::from_millis(100));

        assert!(iter.next().is_none());
        assert!(iter.timed_out());
        assert!(iter.next().is_none());
        assert!(start.elapsed() < Duration::from_secs(4));
    }

    #[test]
    fn test_evenly_spaced_fps_spreads_frames_over_duration() {
        // 61 seconds, minus the one second safety margin, over 60 frames is one frame per second.
        let fps = evenly_spaced_fps(Duration::from_secs(61), 60);
        assert_eq!(fps.as_deref(), Some("fps=1000/1000"));

        let fps = evenly_spaced_fps(Duration::from_secs(11), 20);
        assert_eq!(fps.as_deref(), Some("fps=1000/500"));
    }

    #[test]
    fn test_evenly_spaced_fps_never_divides_by_zero() {
        let fps = evenly_spaced_fps(Duration::from_millis(200), 1000);
        assert_eq!(fps.as_deref(), Some("fps=1000/1"));
    }

    #[test]
    fn test_unknown_duration_reads_every_frame() {
        assert_eq!(evenly_spaced_fps(Duration::ZERO, 60), None);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        if !ffmpeg_and_ffprobe_are_callable() {
            return;
        }
        let result = FfmpegFrameReaderBuilder::new("/nonexistent/file.mp4")
            .evenly_spaced()
            .num_frames(4)
            .spawn_rgb();
        assert!(result.is_err());
    }
}
