/// Injected once per fresh page load. Guarded by a window flag so a
/// repeated injection on the same document is a no-op.
pub const FINGERPRINT_SCRIPT: &str = r#"
if (!window.__cbPrimed) {
    window.__cbPrimed = true;

    Object.defineProperty(navigator, 'webdriver', { get: () => undefined });
    window.chrome = window.chrome || { runtime: {} };

    Object.defineProperty(navigator, 'languages', { get: () => ['en-US', 'en'] });
    Object.defineProperty(navigator, 'plugins', {
        get: () => [
            { name: 'Chrome PDF Plugin', filename: 'internal-pdf-viewer' },
            { name: 'Chrome PDF Viewer', filename: 'mhjfbmdgcfjbbpaeojofohoefgiehjai' },
            { name: 'Native Client', filename: 'internal-nacl-plugin' },
        ],
    });

    const origToDataURL = HTMLCanvasElement.prototype.toDataURL;
    HTMLCanvasElement.prototype.toDataURL = function (...args) {
        const ctx = this.getContext('2d');
        if (ctx && this.width > 2 && this.height > 2) {
            const px = ctx.getImageData(0, 0, 1, 1);
            px.data[0] = px.data[0] ^ 1;
            ctx.putImageData(px, 0, 0);
        }
        return origToDataURL.apply(this, args);
    };

    const origGetParameter = WebGLRenderingContext.prototype.getParameter;
    WebGLRenderingContext.prototype.getParameter = function (param) {
        if (param === 37445) return 'Intel Inc.';
        if (param === 37446) return 'Intel Iris OpenGL Engine';
        return origGetParameter.apply(this, arguments);
    };

    const origGetChannelData = AudioBuffer.prototype.getChannelData;
    AudioBuffer.prototype.getChannelData = function (...args) {
        const data = origGetChannelData.apply(this, args);
        for (let i = 0; i < data.length; i += 500) {
            data[i] = data[i] + 1e-7;
        }
        return data;
    };
}
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_is_injection_guarded() {
        assert!(FINGERPRINT_SCRIPT.contains("window.__cbPrimed"));
    }

    #[test]
    fn script_covers_all_spoof_surfaces() {
        for surface in ["webdriver", "plugins", "languages", "toDataURL", "getParameter", "getChannelData"] {
            assert!(FINGERPRINT_SCRIPT.contains(surface), "missing {}", surface);
        }
    }
}
