//! The injected probe script.
//!
//! Enumerates visible, enabled inputs/selects/buttons/radios/checkboxes and
//! tags each with a `data-agent-id` attribute when it lacks one, so the
//! returned selectors stay addressable for the rest of the page lifetime.
//! The id counter lives on `window` so repeated probes never reuse an id.
//!
//! Label inference priority: `<label for>` association, then a label inside
//! a nearby ancestor (depth <= 3), then short preceding-sibling text, then
//! placeholder/title, then empty.

pub const PROBE_JS: &str = r#"
(() => {
    const isVisible = (el) => !!(el.offsetWidth || el.offsetHeight || el.getClientRects().length);

    if (typeof window.__formpilotSeq !== 'number') window.__formpilotSeq = 0;

    const stabilize = (el) => {
        if (!el.hasAttribute('data-agent-id')) {
            window.__formpilotSeq += 1;
            el.setAttribute('data-agent-id', 'fp-' + window.__formpilotSeq);
        }
        return '[data-agent-id="' + el.getAttribute('data-agent-id') + '"]';
    };

    const getLabel = (el) => {
        if (el.id) {
            const lbl = document.querySelector('label[for="' + el.id + '"]');
            if (lbl) return lbl.innerText.replace('*', '').trim();
        }
        let parent = el.parentElement;
        let depth = 0;
        while (parent && depth < 3) {
            const childLabel = parent.querySelector('label');
            if (childLabel) return childLabel.innerText.replace('*', '').trim();
            const prev = parent.previousElementSibling;
            if (prev && prev.innerText) {
                const text = prev.innerText.trim();
                if (text.length > 0 && text.length < 50) return text.replace('*', '').trim();
            }
            parent = parent.parentElement;
            depth++;
        }
        return el.placeholder || el.title || '';
    };

    const results = [];

    document.querySelectorAll('input:not([type="hidden"])').forEach(el => {
        if (!isVisible(el) || el.disabled) return;
        const type = (el.type || 'text').toLowerCase();
        if (type === 'radio' || type === 'checkbox') {
            results.push({
                kind: type,
                name: el.name || '',
                label: el.nextSibling && el.nextSibling.textContent
                    ? el.nextSibling.textContent.trim()
                    : getLabel(el),
                selector: stabilize(el),
                checked: el.checked
            });
            return;
        }
        if (type === 'submit' || type === 'button') {
            results.push({
                kind: 'button',
                label: (el.value || '').trim(),
                selector: stabilize(el)
            });
            return;
        }
        const haystack = (el.id + ' ' + el.name + ' ' + (el.placeholder || '')).toLowerCase();
        results.push({
            kind: 'input',
            inputType: type,
            label: getLabel(el),
            placeholder: el.placeholder || '',
            value: el.value || '',
            isCaptcha: haystack.includes('captcha'),
            selector: stabilize(el)
        });
    });

    document.querySelectorAll('select').forEach(el => {
        if (!isVisible(el) || el.disabled) return;
        const rawOptions = Array.from(el.options);
        const placeholderText = rawOptions.length > 0 ? rawOptions[0].text.trim() : '';
        const options = rawOptions
            .map(o => ({ value: o.value, text: o.text.trim() }))
            .filter(o => o.value && o.text
                && o.text.toLowerCase() !== 'select'
                && !o.text.toLowerCase().includes('--select'));
        let label = getLabel(el);
        if (!label) label = placeholderText;
        results.push({
            kind: 'select',
            label: label,
            value: el.value || '',
            options: options,
            selector: stabilize(el)
        });
    });

    document.querySelectorAll('button, a.btn').forEach(el => {
        if (!isVisible(el) || el.disabled) return;
        results.push({
            kind: 'button',
            label: el.innerText ? el.innerText.trim() : '',
            selector: stabilize(el)
        });
    });

    return results;
})()"#;
