use crate::config::{CtaAction, MediaBlock, MediaKind, PopupConfig};

use super::descriptor::{
    ActionBinding, ActionRegion, DismissRegion, MediaContent, MediaRegion, OverlayRegion,
    RenderDescriptor, TextRegion,
};
use super::media::has_video_extension;

const CLOSE_GLYPH: &str = "\u{00d7}";

pub fn build_descriptor(config: &PopupConfig) -> RenderDescriptor {
    let content = &config.content;

    RenderDescriptor {
        identity: config.identity.clone(),
        layout: config.position,
        overlay: OverlayRegion {
            opacity: config.overlay_opacity,
            backdrop_dismiss: config.dismissal.backdrop_close,
        },
        background: content.background.clone(),
        header: TextRegion {
            text: content.headline.clone(),
            color: content.headline_color.clone(),
        },
        body: TextRegion {
            text: content.text.clone(),
            color: content.text_color.clone(),
        },
        media: resolve_media(&config.media),
        action: ActionRegion {
            label: config.cta.label.clone(),
            background: config.cta.background.clone(),
            color: config.cta.color.clone(),
            binding: cta_binding(config.cta.action, &config.cta.link),
        },
        dismiss: config.dismissal.show_close.then(|| DismissRegion {
            glyph: CLOSE_GLYPH.into(),
            binding: ActionBinding::Dismiss,
        }),
    }
}

fn cta_binding(action: CtaAction, link: &str) -> ActionBinding {
    match action {
        CtaAction::SameTab => ActionBinding::NavigateSameTab { url: link.into() },
        CtaAction::NewTab => ActionBinding::NavigateNewTab { url: link.into() },
        CtaAction::CloseOnly => ActionBinding::Dismiss,
    }
}

/// `None` kind or a missing source renders nothing.
fn resolve_media(media: &MediaBlock) -> Option<MediaRegion> {
    let source = media.source.as_deref()?;

    let content = match media.kind {
        MediaKind::None => return None,
        MediaKind::Icon => MediaContent::Glyph {
            text: source.into(),
        },
        MediaKind::Video => MediaContent::Playable {
            source: source.into(),
        },
        MediaKind::Image if has_video_extension(source) => MediaContent::Playable {
            source: source.into(),
        },
        MediaKind::Image => MediaContent::Image {
            source: source.into(),
        },
    };

    Some(MediaRegion {
        content,
        link: media
            .link
            .as_ref()
            .map(|url| ActionBinding::NavigateNewTab { url: url.clone() }),
    })
}
