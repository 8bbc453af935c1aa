// SPDX-License-Identifier: GPL-3.0-only

//! Port format configuration
//!
//! The driver works on whole macroblocks, so buffer dimensions are padded up
//! to the alignment while the crop rectangle keeps the size that was actually
//! asked for. Downstream consumers only ever see the cropped frame.

use super::checked::Checked;
use crate::constants::{HEIGHT_ALIGNMENT, WIDTH_ALIGNMENT};
use crate::errors::{HalCall, HalError, Status};
use crate::hal::{ComponentInfo, Encoding, MediaHal, PortFormat, PortLabel, PortRef, Rect};
use std::panic::Location;
use tracing::debug;

/// Smallest multiple of `alignment` that is `>= value`, or `None` if that
/// does not fit in a `u32`
pub const fn align_up(value: u32, alignment: u32) -> Option<u32> {
    value.checked_next_multiple_of(alignment)
}

/// Padded format for a `width` x `height` frame, cropped back to the request.
///
/// `None` when the padded size would overflow.
pub fn aligned_format(encoding: Encoding, width: u32, height: u32) -> Option<PortFormat> {
    Some(PortFormat {
        encoding,
        width: align_up(width, WIDTH_ALIGNMENT)?,
        height: align_up(height, HEIGHT_ALIGNMENT)?,
        crop: Rect::new(0, 0, width, height),
    })
}

/// A port whose format the driver has accepted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfiguredPort {
    pub port: PortRef,
    pub label: PortLabel,
    pub format: PortFormat,
}

/// Set and commit the format of `port` on `component`.
///
/// Fails with the driver's status when the encoding or size is unsupported.
/// A size that cannot be padded is refused as `EINVAL` without calling the
/// driver.
#[track_caller]
pub fn configure_port<H: MediaHal + ?Sized>(
    hal: Checked<'_, H>,
    component: &ComponentInfo,
    port: PortRef,
    encoding: Encoding,
    width: u32,
    height: u32,
) -> Result<ConfiguredPort, HalError> {
    let Some(format) = aligned_format(encoding, width, height) else {
        return Err(HalError {
            call: HalCall::CommitFormat,
            status: Status::EINVAL,
            location: Location::caller(),
        });
    };
    let label = component.label(&port);

    hal.commit_format(port, &format)?;
    debug!("{}: format committed: {}", label, format);

    Ok(ConfiguredPort {
        port,
        label,
        format,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::simulated::SimulatedHal;

    #[test]
    fn test_align_up() {
        assert_eq!(align_up(0, 32), Some(0));
        assert_eq!(align_up(1, 32), Some(32));
        assert_eq!(align_up(32, 32), Some(32));
        assert_eq!(align_up(33, 32), Some(64));
        assert_eq!(align_up(767, 16), Some(768));
    }

    #[test]
    fn test_align_up_near_u32_max() {
        assert_eq!(align_up(u32::MAX - 31, 32), Some(u32::MAX - 31));
        assert_eq!(align_up(u32::MAX - 30, 32), None);
        assert_eq!(align_up(u32::MAX - 1, 16), None);
        assert!(aligned_format(Encoding::Rgb24, u32::MAX - 1, 512).is_none());
        assert!(aligned_format(Encoding::Rgb24, 512, u32::MAX).is_none());
    }

    #[test]
    fn test_padding_over_size_range() {
        for width in 1..=700 {
            for height in (1..=500).step_by(7) {
                let format = aligned_format(Encoding::I420, width, height).unwrap();
                assert_eq!(format.width % 32, 0);
                assert_eq!(format.height % 16, 0);
                assert!(format.width >= width && format.width - width < 32);
                assert!(format.height >= height && format.height - height < 16);
                assert_eq!(format.crop, Rect::new(0, 0, width, height));
            }
        }
    }

    #[test]
    fn test_configure_port_commits_padded_format() {
        let hal = SimulatedHal::new();
        let checked = Checked::new(&hal);
        let camera = checked.create_component("vc.ril.camera").unwrap();
        let port = camera.output(2).unwrap();

        let configured =
            configure_port(checked, &camera, port, Encoding::Rgb24, 500, 300).unwrap();

        assert_eq!(configured.label.as_str(), "vc.ril.camera:out:2");
        let committed = hal.committed_format(port).unwrap();
        assert_eq!(committed, configured.format);
        assert_eq!((committed.width, committed.height), (512, 304));
        assert_eq!(committed.crop, Rect::new(0, 0, 500, 300));
    }

    #[test]
    fn test_configure_port_propagates_driver_status() {
        let hal = SimulatedHal::new();
        let checked = Checked::new(&hal);
        let camera = checked.create_component("vc.ril.camera").unwrap();
        hal.fail_on(HalCall::CommitFormat, 0, Status::ENOSYS);

        let err = configure_port(
            checked,
            &camera,
            camera.output(0).unwrap(),
            Encoding::I420,
            1024,
            768,
        )
        .unwrap_err();
        assert_eq!(err.status, Status::ENOSYS);
        assert_eq!(err.location.file(), file!());
    }

    #[test]
    fn test_configure_port_refuses_unpaddable_size() {
        let hal = SimulatedHal::new();
        let checked = Checked::new(&hal);
        let camera = checked.create_component("vc.ril.camera").unwrap();
        let port = camera.output(2).unwrap();

        let expected_line = line!() + 1;
        let err = configure_port(checked, &camera, port, Encoding::Rgb24, u32::MAX - 1, 512)
            .unwrap_err();
        assert_eq!(err.call, HalCall::CommitFormat);
        assert_eq!(err.status, Status::EINVAL);
        assert_eq!(err.location.file(), file!());
        assert_eq!(err.location.line(), expected_line);
        assert_eq!(hal.calls(), vec![HalCall::CreateComponent]);
        assert!(hal.committed_format(port).is_none());
    }
}
