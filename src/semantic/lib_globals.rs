//! Names supplied by the default compilation environment
//!
//! tsc binds these from its bundled `lib.*.d.ts` files (ES, DOM, WebWorker) and from
//! common runtime typings. The engine does not ship those files, so a name that no
//! project or `@types` file declares is checked against this catalog before it is
//! reported as unresolved.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

static LIB_GLOBALS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        // ES values and functions
        "globalThis", "undefined", "NaN", "Infinity", "eval", "isNaN", "isFinite",
        "parseInt", "parseFloat", "encodeURIComponent", "decodeURIComponent", "encodeURI",
        "decodeURI", "escape", "unescape", "arguments", "JSON", "Math", "Reflect", "Intl",
        "Atomics", "WebAssembly",
        // ES constructors
        "Object", "Function", "Array", "String", "Number", "Boolean", "Symbol", "BigInt",
        "Date", "RegExp", "Error", "TypeError", "RangeError", "SyntaxError",
        "ReferenceError", "EvalError", "URIError", "AggregateError", "Promise", "Proxy",
        "Map", "Set", "WeakMap", "WeakSet", "WeakRef", "FinalizationRegistry",
        "ArrayBuffer", "SharedArrayBuffer", "DataView", "Int8Array", "Uint8Array",
        "Uint8ClampedArray", "Int16Array", "Uint16Array", "Int32Array", "Uint32Array",
        "Float32Array", "Float64Array", "BigInt64Array", "BigUint64Array",
        // ES interfaces and utility types
        "Partial", "Required", "Readonly", "Record", "Pick", "Omit", "Exclude", "Extract",
        "NonNullable", "Parameters", "ConstructorParameters", "ReturnType", "InstanceType",
        "ThisParameterType", "OmitThisParameter", "ThisType", "Awaited", "NoInfer",
        "Uppercase", "Lowercase", "Capitalize", "Uncapitalize", "PromiseLike",
        "PromiseConstructor", "PromiseSettledResult", "PromiseFulfilledResult",
        "PromiseRejectedResult", "ArrayLike", "ReadonlyArray", "ReadonlyMap", "ReadonlySet",
        "ArrayConstructor", "ObjectConstructor", "StringConstructor", "NumberConstructor",
        "FunctionConstructor", "ErrorConstructor", "DateConstructor", "RegExpConstructor",
        "RegExpMatchArray", "RegExpExecArray", "Iterable", "Iterator", "IterableIterator",
        "IteratorResult", "IteratorYieldResult", "IteratorReturnResult", "AsyncIterable",
        "AsyncIterator", "AsyncIterableIterator", "Generator", "GeneratorFunction",
        "AsyncGenerator", "AsyncGeneratorFunction", "PropertyKey", "PropertyDescriptor",
        "PropertyDescriptorMap", "TemplateStringsArray", "TypedPropertyDescriptor",
        "ClassDecorator", "PropertyDecorator", "MethodDecorator", "ParameterDecorator",
        "ClassDecoratorContext", "ClassMethodDecoratorContext", "ClassFieldDecoratorContext",
        "ClassGetterDecoratorContext", "ClassSetterDecoratorContext",
        "ClassAccessorDecoratorContext", "DecoratorContext", "CallableFunction",
        "NewableFunction", "IArguments", "ArrayBufferLike", "ArrayBufferView",
        "WeakKey", "SymbolConstructor", "Disposable", "AsyncDisposable",
        "DisposableStack", "AsyncDisposableStack", "SuppressedError",
        // Timers and scheduling
        "setTimeout", "clearTimeout", "setInterval", "clearInterval", "setImmediate",
        "clearImmediate", "queueMicrotask", "requestAnimationFrame",
        "cancelAnimationFrame", "requestIdleCallback", "cancelIdleCallback",
        "structuredClone", "reportError", "atob", "btoa",
        // Browser globals
        "window", "self", "document", "navigator", "location", "history", "screen",
        "localStorage", "sessionStorage", "indexedDB", "caches", "crypto", "performance",
        "console", "alert", "confirm", "prompt", "open", "close", "print", "fetch",
        "getComputedStyle", "matchMedia", "scrollTo", "scrollBy", "postMessage",
        "addEventListener", "removeEventListener", "dispatchEvent", "customElements",
        "devicePixelRatio", "innerWidth", "innerHeight", "outerWidth", "outerHeight",
        "scrollX", "scrollY", "pageXOffset", "pageYOffset", "origin", "isSecureContext",
        "visualViewport", "frames", "parent", "top", "opener", "name", "status",
        "importScripts", "onmessage", "onerror", "onload",
        // DOM and Web API types
        "Window", "Document", "DocumentFragment", "Node", "NodeList", "NodeListOf",
        "Element", "Text", "Comment", "Attr", "ShadowRoot", "ChildNode", "ParentNode",
        "HTMLCollection", "HTMLCollectionOf", "NamedNodeMap", "DOMParser",
        "XMLSerializer", "XMLHttpRequest", "XMLDocument", "Range", "Selection",
        "TreeWalker", "NodeFilter", "NodeIterator", "MutationObserver", "MutationRecord",
        "IntersectionObserver", "IntersectionObserverEntry", "ResizeObserver",
        "ResizeObserverEntry", "PerformanceObserver", "Performance", "PerformanceEntry",
        "PerformanceMark", "PerformanceMeasure", "Navigator", "Location", "History",
        "Screen", "Storage", "StorageEvent", "Crypto", "CryptoKey", "SubtleCrypto",
        "Console", "EventTarget", "EventListener", "EventListenerObject",
        "EventListenerOrEventListenerObject", "AddEventListenerOptions",
        "EventListenerOptions", "Event", "EventInit", "CustomEvent", "CustomEventInit",
        "UIEvent", "MouseEvent", "KeyboardEvent", "FocusEvent", "InputEvent",
        "WheelEvent", "PointerEvent", "TouchEvent", "Touch", "TouchList", "DragEvent",
        "ClipboardEvent", "CompositionEvent", "AnimationEvent", "TransitionEvent",
        "ErrorEvent", "MessageEvent", "ProgressEvent", "PopStateEvent", "HashChangeEvent",
        "PageTransitionEvent", "BeforeUnloadEvent", "SubmitEvent", "FormDataEvent",
        "PromiseRejectionEvent", "CloseEvent", "DOMException", "DOMRect",
        "DOMRectReadOnly", "DOMPoint", "DOMMatrix", "DOMTokenList", "DOMStringMap",
        "DOMImplementation", "CSSStyleDeclaration", "StyleSheet", "MediaQueryList",
        "MediaQueryListEvent", "Image", "Audio", "Option", "ImageData", "ImageBitmap",
        "OffscreenCanvas", "CanvasRenderingContext2D", "OffscreenCanvasRenderingContext2D",
        "CanvasGradient", "CanvasPattern", "Path2D", "TextMetrics", "FileList", "File",
        "FileReader", "Blob", "BlobPart", "BlobPropertyBag", "FormData", "URL",
        "URLSearchParams", "Headers", "HeadersInit", "Request", "RequestInit",
        "RequestInfo", "Response", "ResponseInit", "BodyInit", "ReadableStream",
        "WritableStream", "TransformStream", "ReadableStreamDefaultReader",
        "WritableStreamDefaultWriter", "TextEncoder", "TextDecoder", "AbortController",
        "AbortSignal", "WebSocket", "EventSource", "BroadcastChannel", "MessageChannel",
        "MessagePort", "Worker", "SharedWorker", "ServiceWorker",
        "ServiceWorkerRegistration", "ServiceWorkerContainer", "Notification",
        "Clipboard", "ClipboardItem", "Geolocation", "GeolocationPosition",
        "MediaStream", "MediaStreamTrack", "MediaRecorder", "AudioContext",
        "AudioBuffer", "AudioNode", "Animation", "KeyframeEffect", "Keyframe",
        "ScrollToOptions", "ScrollIntoViewOptions", "ScrollBehavior", "ElementCreationOptions",
        "ShadowRootInit", "CustomElementConstructor", "CustomElementRegistry",
        "FrameRequestCallback", "TimerHandler", "VoidFunction", "Transferable",
        "StructuredSerializeOptions", "IDBDatabase", "IDBFactory", "Cache", "CacheStorage",
        "Credential", "CredentialsContainer", "Permissions", "PermissionStatus",
        "VisualViewport", "GlobalEventHandlers", "WindowEventMap", "DocumentEventMap",
        "HTMLElementEventMap", "ElementEventMap", "HTMLElementTagNameMap",
        "SVGElementTagNameMap", "ElementTagNameMap", "XPathResult", "XPathEvaluator",
        // Node.js and CommonJS
        "process", "require", "module", "exports", "__dirname", "__filename", "global",
        "Buffer", "BufferEncoding", "NodeJS", "NodeRequire", "NodeModule",
    ]
    .into_iter()
    .collect()
});

/// DOM interface families (`HTMLInputElement`, `SVGPathElement`, `CSSStyleRule`, ...)
static DOM_FAMILY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(HTML|SVG|CSS|IDB|RTC|WebGL2?|GPU|MIDI|XR|Speech)[A-Z][A-Za-z0-9]*$")
        .expect("static regex")
});

/// Whether `name` is provided by the default lib when nothing in the project declares it
pub fn is_lib_global(name: &str) -> bool {
    LIB_GLOBALS.contains(name) || DOM_FAMILY.is_match(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_browser_and_runtime_names() {
        for name in [
            "performance",
            "localStorage",
            "HTMLInputElement",
            "SVGPathElement",
            "KeyboardEvent",
            "requestAnimationFrame",
            "Buffer",
            "Awaited",
        ] {
            assert!(is_lib_global(name), "{}", name);
        }
    }

    #[test]
    fn test_project_names_are_not_lib() {
        for name in ["undefinedName", "UserService", "HTML", "Html5Parser", "missing0"] {
            assert!(!is_lib_global(name), "{}", name);
        }
    }
}
