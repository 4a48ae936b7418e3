use crate::types::CHANNEL_COUNT;

/// The five passes executed every frame, in their fixed order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum PassId {
    BufferA,
    BufferB,
    BufferC,
    BufferD,
    Image,
}

impl PassId {
    pub fn label(self) -> &'static str {
        match self {
            PassId::BufferA => "buffer A",
            PassId::BufferB => "buffer B",
            PassId::BufferC => "buffer C",
            PassId::BufferD => "buffer D",
            PassId::Image => "image",
        }
    }
}

/// Which texture a channel slot reads from.
///
/// `CurrentFrame` taps the output a pass wrote earlier in this frame;
/// `PriorFrame` taps the completed result from the previous frame. Making
/// the distinction explicit here keeps the same-frame dependency a property
/// of the graph rather than of buffer mutation order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ChannelTap {
    PriorFrame(PassId),
    CurrentFrame(PassId),
}

/// One pass and the channel wiring it renders with.
#[derive(Clone, Copy, Debug)]
pub(crate) struct PassSpec {
    pub id: PassId,
    pub channels: [Option<ChannelTap>; CHANNEL_COUNT],
}

/// The static dependency graph, already in topological order.
///
/// Buffer A runs first so B, C, and D can all derive from the field it
/// produced this frame while carrying their own one-frame memory. The image
/// pass composites the same-frame outputs of A, B, and C; D is rendered but
/// deliberately left out of the composite.
pub(crate) fn frame_graph() -> [PassSpec; 5] {
    use ChannelTap::{CurrentFrame, PriorFrame};
    use PassId::*;
    [
        PassSpec {
            id: BufferA,
            channels: [Some(PriorFrame(BufferA)), Some(PriorFrame(BufferB)), None],
        },
        PassSpec {
            id: BufferB,
            channels: [Some(CurrentFrame(BufferA)), Some(PriorFrame(BufferB)), None],
        },
        PassSpec {
            id: BufferC,
            channels: [Some(CurrentFrame(BufferA)), Some(PriorFrame(BufferC)), None],
        },
        PassSpec {
            id: BufferD,
            channels: [Some(CurrentFrame(BufferA)), Some(PriorFrame(BufferD)), None],
        },
        PassSpec {
            id: Image,
            channels: [
                Some(CurrentFrame(BufferA)),
                Some(CurrentFrame(BufferB)),
                Some(CurrentFrame(BufferC)),
            ],
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passes_run_in_fixed_total_order() {
        let order: Vec<PassId> = frame_graph().iter().map(|spec| spec.id).collect();
        assert_eq!(
            order,
            vec![
                PassId::BufferA,
                PassId::BufferB,
                PassId::BufferC,
                PassId::BufferD,
                PassId::Image
            ]
        );
    }

    #[test]
    fn derived_buffers_read_buffer_a_from_the_same_frame() {
        for spec in frame_graph() {
            if matches!(spec.id, PassId::BufferB | PassId::BufferC | PassId::BufferD) {
                assert_eq!(
                    spec.channels[0],
                    Some(ChannelTap::CurrentFrame(PassId::BufferA)),
                    "{} must consume the field A just wrote",
                    spec.id.label()
                );
                assert_eq!(spec.channels[1], Some(ChannelTap::PriorFrame(spec.id)));
            }
        }
    }

    #[test]
    fn same_frame_taps_only_point_at_earlier_passes() {
        let graph = frame_graph();
        for (index, spec) in graph.iter().enumerate() {
            for tap in spec.channels.iter().flatten() {
                if let ChannelTap::CurrentFrame(source) = tap {
                    let source_index = graph
                        .iter()
                        .position(|candidate| candidate.id == *source)
                        .expect("tap references a known pass");
                    assert!(
                        source_index < index,
                        "{} taps {} before it has rendered",
                        spec.id.label(),
                        source.label()
                    );
                }
            }
        }
    }

    #[test]
    fn buffer_a_feeds_back_on_itself_and_buffer_b() {
        let graph = frame_graph();
        assert_eq!(
            graph[0].channels[0],
            Some(ChannelTap::PriorFrame(PassId::BufferA))
        );
        assert_eq!(
            graph[0].channels[1],
            Some(ChannelTap::PriorFrame(PassId::BufferB))
        );
    }

    // Buffer D is rendered every frame but never composited. This mirrors
    // the artwork as authored; do not "fix" it without changing the shaders
    // to match.
    #[test]
    fn image_composites_a_b_c_and_ignores_d() {
        let graph = frame_graph();
        let image = graph.last().unwrap();
        assert_eq!(
            image.channels,
            [
                Some(ChannelTap::CurrentFrame(PassId::BufferA)),
                Some(ChannelTap::CurrentFrame(PassId::BufferB)),
                Some(ChannelTap::CurrentFrame(PassId::BufferC)),
            ]
        );
        for tap in image.channels.iter().flatten() {
            let source = match tap {
                ChannelTap::PriorFrame(id) | ChannelTap::CurrentFrame(id) => id,
            };
            assert_ne!(*source, PassId::BufferD);
        }
    }
}
